//! Default display name derived from the client's platform and user agent.

/// What the client knows about itself when it first registers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub platform: String,
    pub user_agent: String,
}

impl ClientInfo {
    /// Describes the machine this process runs on.
    pub fn native(user_agent: impl Into<String>) -> Self {
        let platform = match std::env::consts::OS {
            "linux" => "Linux",
            "windows" => "Windows",
            "macos" => "macOS",
            "android" => "Android",
            "ios" => "iOS",
            other => other,
        };
        Self {
            platform: platform.to_string(),
            user_agent: user_agent.into(),
        }
    }
}

/// `"<platform> • <browser>"`, sniffing the browser from the user agent.
pub fn default_name(info: &ClientInfo) -> String {
    let platform = match info.platform.trim() {
        "" => "Device",
        p => p,
    };
    let ua = info.user_agent.to_lowercase();
    // "edg" must win over "chrome", and "chrome" over "safari": Chromium
    // user agents mention every engine they are compatible with.
    let browser = if ua.contains("edg") {
        "Edge"
    } else if ua.contains("chrome") {
        "Chrome"
    } else if ua.contains("safari") {
        "Safari"
    } else if ua.contains("firefox") {
        "Firefox"
    } else if ua.contains("android") {
        "Android"
    } else {
        "Browser"
    };
    format!("{platform} • {browser}")
}
