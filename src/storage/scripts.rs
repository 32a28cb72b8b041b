/// 令牌桶原子步骤，Redis 保证脚本执行期间不会插入同一 key 的其他命令。
///
/// KEYS[1] = 桶的 key
/// ARGV = capacity, refill_rate, now, cost, ttl
///
/// 返回 {allowed, remaining, retry_after, seconds_until_full}，
/// remaining 以字符串返回，否则 Redis 会把 Lua 数字截断成整数。
pub const TOKEN_BUCKET_SCRIPT: &str = r#"
local key = KEYS[1]
local capacity = tonumber(ARGV[1])
local refill_rate = tonumber(ARGV[2])
local now = tonumber(ARGV[3])
local cost = tonumber(ARGV[4])
local ttl = tonumber(ARGV[5])

local state = redis.call('HMGET', key, 'tokens', 'last_refill')
local tokens = tonumber(state[1])
local last_refill = tonumber(state[2])

if tokens == nil then
  tokens = capacity
  last_refill = now
elseif last_refill == nil then
  last_refill = now
end

local elapsed = math.max(0, now - last_refill)
tokens = math.min(capacity, tokens + elapsed * refill_rate)

local allowed = 0
local retry_after = 0

if tokens >= cost then
  tokens = tokens - cost
  allowed = 1
  redis.call('HSET', key,
    'tokens', string.format('%.17g', tokens),
    'last_refill', string.format('%.17g', math.max(now, last_refill)))
  redis.call('EXPIRE', key, ttl)
else
  retry_after = math.ceil((cost - tokens) / refill_rate)
end

local seconds_until_full = math.ceil((capacity - tokens) / refill_rate)

return {allowed, string.format('%.17g', tokens), retry_after, seconds_until_full}
"#;
