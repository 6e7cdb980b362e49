//! Endpoint paths and server-imposed limits.

/// Registers a new device or renames an existing one.
pub const REGISTER_PATH: &str = "/api/devices/register";

/// Returns the pending transfer for a device (`204` when none).
pub const PENDING_PATH: &str = "/api/devices/pending";

/// Clears a pending transfer after it was opened or dismissed.
pub const CLEAR_PATH: &str = "/api/devices/clear";

/// Lists every registered device.
pub const DEVICES_PATH: &str = "/api/devices";

/// Pushes a transfer notification to a device.
pub const NOTIFY_PATH: &str = "/api/devices/notify";

/// Page that accepts an incoming transfer.
pub const INCOMING_PATH: &str = "/incoming";

/// Maximum device name length the server keeps.
pub const MAX_DEVICE_NAME_LEN: usize = 40;
