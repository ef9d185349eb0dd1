use std::path::PathBuf;

/// Daemon configuration, loaded from environment variables.
pub struct Config {
    /// V4L2 device path (default: /dev/video0).
    pub camera_device: String,
    /// Directory containing ONNX model files.
    pub model_dir: PathBuf,
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// Directory of member enrollment photos (`<member_id>.<ext>`).
    pub photo_dir: PathBuf,
    /// Path to the persisted reminder-debounce document.
    pub reminder_state_path: PathBuf,
    /// Euclidean distance threshold for a positive match.
    pub match_threshold: f32,
    /// Run recognition on every Kth captured frame.
    pub recognize_every: u32,
    /// Delay between capture cycles, in milliseconds.
    pub cycle_interval_ms: u64,
    /// Integer downscale factor applied to frames before recognition.
    pub recognition_downscale: u32,
    /// Messaging gateway endpoint for payment reminders.
    pub gateway_url: String,
    /// Per-recipient send timeout in seconds.
    pub send_timeout_secs: u64,
    /// Country calling prefix prepended to stored phone digits.
    pub country_prefix: String,
    /// Seconds to defer the startup reminder pass.
    pub reminder_delay_secs: u64,
}

impl Config {
    /// Load configuration from `GYMGATE_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("gymgate");

        let model_dir = std::env::var("GYMGATE_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("models"));

        let db_path = std::env::var("GYMGATE_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("gym.db"));

        let photo_dir = std::env::var("GYMGATE_PHOTO_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("member-photos"));

        let reminder_state_path = std::env::var("GYMGATE_REMINDER_STATE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("reminders.json"));

        Self {
            camera_device: std::env::var("GYMGATE_CAMERA_DEVICE")
                .unwrap_or_else(|_| "/dev/video0".to_string()),
            model_dir,
            db_path,
            photo_dir,
            reminder_state_path,
            match_threshold: env_f32("GYMGATE_MATCH_THRESHOLD", 0.6),
            recognize_every: env_u32("GYMGATE_RECOGNIZE_EVERY", 5),
            cycle_interval_ms: env_u64("GYMGATE_CYCLE_INTERVAL_MS", 30),
            recognition_downscale: env_u32("GYMGATE_RECOGNITION_DOWNSCALE", 4),
            gateway_url: std::env::var("GYMGATE_GATEWAY_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8780/send".to_string()),
            send_timeout_secs: env_u64("GYMGATE_SEND_TIMEOUT_SECS", 20),
            country_prefix: std::env::var("GYMGATE_COUNTRY_PREFIX")
                .unwrap_or_else(|_| "+91".to_string()),
            reminder_delay_secs: env_u64("GYMGATE_REMINDER_DELAY_SECS", 5),
        }
    }

    /// Path to the face detection model.
    pub fn detector_model_path(&self) -> String {
        self.model_dir
            .join("version-RFB-320.onnx")
            .to_string_lossy()
            .into_owned()
    }

    /// Path to the face encoding model.
    pub fn encoder_model_path(&self) -> String {
        self.model_dir
            .join("mobilefacenet.onnx")
            .to_string_lossy()
            .into_owned()
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
