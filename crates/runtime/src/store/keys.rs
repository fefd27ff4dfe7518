//! Session-store key schema.
//!
//! Every key the engine touches is built here so the keyspace reads as one
//! table. All combat keys are scoped to a session id; arena and account keys
//! are scoped to a character id.

/// `combat:rbc:{S}:meta` - session metadata hash.
pub fn meta(session_id: &str) -> String {
    format!("combat:rbc:{session_id}:meta")
}

/// `combat:rbc:{S}:actors` - participant containers, field = participant id.
pub fn actors(session_id: &str) -> String {
    format!("combat:rbc:{session_id}:actors")
}

/// `combat:rbc:{S}:moves:{A}` - outstanding intents from actor A, field = target id.
pub fn moves(session_id: &str, actor_id: i64) -> String {
    format!("combat:rbc:{session_id}:moves:{actor_id}")
}

/// `combat:rbc:{S}:exchanges:{A}` - FIFO of opposing ids awaiting pairing.
pub fn exchanges(session_id: &str, actor_id: i64) -> String {
    format!("combat:rbc:{session_id}:exchanges:{actor_id}")
}

/// `combat:sess:{S}:logs` - append-only combat log.
pub fn logs(session_id: &str) -> String {
    format!("combat:sess:{session_id}:logs")
}

/// `arena:queue:{mode}:zset` - rating-ordered matchmaking queue.
pub fn arena_queue(mode: &str) -> String {
    format!("arena:queue:{mode}:zset")
}

/// `arena:req:{char_id}` - short-TTL match request.
pub fn arena_request(char_id: i64) -> String {
    format!("arena:req:{char_id}")
}

/// `player:status:{char_id}` - where the character currently is.
pub fn player_status(char_id: i64) -> String {
    format!("player:status:{char_id}")
}

/// `ac:{char_id}` - persistent account hash.
pub fn account(char_id: i64) -> String {
    format!("ac:{char_id}")
}

/// `skill:{char_id}` - skill progress hash, field = skill family.
pub fn skills(char_id: i64) -> String {
    format!("skill:{char_id}")
}

/// Prefix shared by all session meta keys, for the recovery scan.
pub const META_PREFIX: &str = "combat:rbc:";

/// Extract the session id from a meta key produced by [`meta`].
pub fn session_of_meta_key(key: &str) -> Option<&str> {
    key.strip_prefix(META_PREFIX)?.strip_suffix(":meta")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_key_round_trips() {
        let key = meta("abc-123");
        assert_eq!(session_of_meta_key(&key), Some("abc-123"));
        assert_eq!(session_of_meta_key("combat:rbc:xyz:actors"), None);
    }
}
