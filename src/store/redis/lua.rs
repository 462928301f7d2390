use tokio::sync::OnceCell;

pub(crate) static GET_SCRIPT_HASH: OnceCell<String> = OnceCell::const_new();
pub(crate) static REPLACE_SCRIPT_HASH: OnceCell<String> = OnceCell::const_new();
pub(crate) static UPDATE_SCRIPT_HASH: OnceCell<String> = OnceCell::const_new();

// Returns nil for a missing key, otherwise `{ttl, field1, value1, ...}`.
pub(crate) static GET_SCRIPT: &str = r#"
    local key = KEYS[1]

    local ttl = redis.call('TTL', key)
    if ttl == -2 then
        return false
    end

    local fields = redis.call('HGETALL', key)
    table.insert(fields, 1, ttl)

    return fields
"#;

// ARGV[1] is the ttl in seconds: -1 never expires, 0 is already expired.
pub(crate) static REPLACE_SCRIPT: &str = r#"
    local key = KEYS[1]
    local seconds = tonumber(ARGV[1])

    redis.call('DEL', key)
    if seconds == 0 then
        return 1
    end

    redis.call('HSET', key, unpack(ARGV, 2))

    if seconds > 0 then
        redis.call('EXPIRE', key, seconds)
    end

    return 1
"#;

pub(crate) static UPDATE_SCRIPT: &str = r#"
    local key = KEYS[1]
    local seconds = tonumber(ARGV[1])

    if seconds == 0 then
        redis.call('DEL', key)
        return 1
    end

    redis.call('HSET', key, unpack(ARGV, 2))

    if seconds > 0 then
        redis.call('EXPIRE', key, seconds)
    else
        redis.call('PERSIST', key)
    end

    return 1
"#;
