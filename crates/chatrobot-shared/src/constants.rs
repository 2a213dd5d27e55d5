/// Base URL of the hosted AI gateway (no trailing slash)
pub const DEFAULT_GATEWAY_URL: &str = "https://ark.cn-beijing.volces.com/api/v3";

/// Relay base URL used until the user configures their own
pub const DEFAULT_RELAY_URL: &str = "http://127.0.0.1:3000";

/// Default text completion model
pub const DEFAULT_MODEL: &str = "doubao-1-5-thinking-pro-250415";

/// Model used for image + text turns
pub const VISION_MODEL: &str = "doubao-seed-1-6-vision-250815";

/// Model used for image generation
pub const IMAGE_MODEL: &str = "doubao-seedream-4-0-250828";

/// Target resolution requested from the image model
pub const IMAGE_SIZE: &str = "2K";

/// Response format requested from the image model
pub const IMAGE_RESPONSE_FORMAT: &str = "b64_json";

// Per-user config defaults
pub const DEFAULT_ROBOT_NAME: &str = "AI";
pub const DEFAULT_MAX_TOKENS: i64 = 60;
pub const DEFAULT_TEMPERATURE: f64 = 0.5;
pub const DEFAULT_TOP_P: f64 = 1.0;
pub const DEFAULT_FREQUENCY_PENALTY: f64 = 0.0;
pub const DEFAULT_PRESENCE_PENALTY: f64 = 0.6;
pub const DEFAULT_SYSTEM_PROMPT: &str = "你是人工智能助手.";

/// Name given to the local user created on first launch
pub const DEFAULT_USER_NAME: &str = "用户";

/// Title of freshly created conversations
pub const DEFAULT_CONVERSATION_TITLE: &str = "新对话";

/// Content stored on assistant messages that carry a generated image
pub const GENERATED_IMAGE_PLACEHOLDER: &str = "[生成图片]";

/// Content written to a message whose retry found nothing to resend
pub const NO_RETRY_CONTENT: &str = "无可用的重试内容";

/// Shown when the gateway could not be reached at all
pub const TRANSPORT_FAILURE_TEXT: &str = "请求失败，请检查网络或API密钥配置";

/// Shown when the gateway rejected a request without a body
pub const UPSTREAM_FAILURE_TEXT: &str = "请求失败";

/// Prefix of every image generation failure message
pub const IMAGE_GEN_FAILURE_TEXT: &str = "图片生成失败";

/// Shown when a locally attached image could not be read
pub const IMAGE_READ_FAILURE_TEXT: &str = "图片读取失败";

/// Prefix marking an inline base64 image reference
pub const BASE64_IMAGE_PREFIX: &str = "base64:";

/// Phrases that route a message to image generation (matched lowercase, as substrings)
pub const IMAGE_TRIGGER_KEYWORDS: &[&str] = &[
    "生成图片",
    "图片生成",
    "帮我生成",
    "画一张",
    "帮我画",
    "生成一张",
    "generate image",
    "draw",
];

/// Messages of session history sent with each text completion
pub const HISTORY_WINDOW: usize = 10;

/// Messages summarised when regenerating a conversation title
pub const TITLE_WINDOW: usize = 6;

pub const TITLE_TEMPERATURE: f64 = 0.3;
pub const TITLE_MAX_TOKENS: i64 = 30;
pub const TITLE_PROMPT: &str = "请用不超过12字为下面对话生成中文标题，不要标点:\n";
pub const TITLE_USER_PREFIX: &str = "用户:";
pub const TITLE_ASSISTANT_PREFIX: &str = "AI:";

/// Transport budgets (seconds)
pub const CONNECT_TIMEOUT_SECS: u64 = 60;
pub const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Default relay HTTP port
pub const DEFAULT_RELAY_PORT: u16 = 3000;

/// Largest JSON body the relay accepts (10 MiB)
pub const MAX_RELAY_BODY: usize = 10 * 1024 * 1024;
