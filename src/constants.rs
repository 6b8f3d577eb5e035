//! Application constants

/// Upstream accounts swept by the daily fetch cycle, in visit order.
pub const REEL_ACCOUNTS: &[&str] = &[
    "pets",
    "jiffpom",
    "nala_cat",
    "realgrumpycat",
    "itsdougthepug",
    "marniethedog",
    "tunameltsmyheart",
    "venustwofacecat",
];

/// Upstream reel listing endpoint (RapidAPI)
pub const REELS_API_URL: &str = "https://instagram-scraper-api2.p.rapidapi.com/v1/reels";

/// RapidAPI host header value for the listing endpoint
pub const REELS_API_HOST: &str = "instagram-scraper-api2.p.rapidapi.com";

/// Upstream fetch request timeout in seconds
pub const REELS_FETCH_TIMEOUT_SECS: u64 = 30;

/// Reels older than this are removed by the hourly sweep
pub const REEL_RETENTION_HOURS: i64 = 24;

/// Fetch cycle schedule: midnight daily (sec min hour dom month dow)
pub const DEFAULT_FETCH_CRON: &str = "0 0 0 * * *";

/// Expiration sweep schedule: top of every hour
pub const DEFAULT_EXPIRE_CRON: &str = "0 0 * * * *";

/// Primary chat completion endpoint
pub const CHAT_API_URL: &str =
    "https://router.huggingface.co/fireworks-ai/inference/v1/chat/completions";

/// Secondary chat completion endpoint, used only when the primary times out
pub const CHAT_FALLBACK_URL: &str =
    "https://router.huggingface.co/novita/v3/openai/chat/completions";

pub const CHAT_MODEL: &str = "accounts/fireworks/models/deepseek-v3";
pub const CHAT_FALLBACK_MODEL: &str = "deepseek/deepseek-v3-turbo";

/// Seconds to wait on the primary chat endpoint before falling back
pub const CHAT_PRIMARY_TIMEOUT_SECS: u64 = 5;

/// Translate TTS endpoint (one MP3 segment per request)
pub const TTS_URL: &str = "https://translate.google.com/translate_tts";

/// Maximum text length per TTS request
pub const TTS_CHUNK_CHARS: usize = 200;

/// Questions returned per quiz draw
pub const QUIZ_SIZE: usize = 10;

/// Maximum request body size for attachment uploads (100 MB)
pub const MAX_UPLOAD_SIZE: usize = 100 * 1024 * 1024;
