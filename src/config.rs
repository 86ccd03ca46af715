use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Vitalink";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Fixed user identity the backend presents to the agent server.
pub const AGENT_USER_ID: &str = "u_backend";

/// Runtime configuration, resolved once at startup from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root data directory. Uploads, transcripts, and generated PDFs live here.
    pub data_dir: PathBuf,
    /// Base URL of the agent server (session create + run).
    pub agent_url: String,
    /// Base URL of the vision LLM API used for OCR text extraction.
    pub vision_url: String,
    /// API key for the vision LLM API.
    pub vision_api_key: String,
    /// Vision model name.
    pub vision_model: String,
    /// Socket address the HTTP server binds to.
    pub bind_addr: String,
    /// Transcription CLI command.
    pub transcriber: String,
}

impl Config {
    /// Resolve configuration from environment variables, with defaults
    /// matching a local development setup.
    pub fn from_env() -> Self {
        Self {
            data_dir: std::env::var("VITALINK_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_data_dir()),
            agent_url: env_or("VITALINK_AGENT_URL", "http://localhost:5010"),
            vision_url: env_or(
                "VITALINK_VISION_URL",
                "https://generativelanguage.googleapis.com",
            ),
            vision_api_key: env_or("VITALINK_VISION_API_KEY", ""),
            vision_model: env_or("VITALINK_VISION_MODEL", "gemini-2.0-flash"),
            bind_addr: env_or("VITALINK_BIND", "0.0.0.0:8000"),
            transcriber: env_or("VITALINK_TRANSCRIBER", "whisperx"),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("vitalink.db")
    }

    pub fn checkin_audio_dir(&self) -> PathBuf {
        self.data_dir.join("uploads/checkins/audio")
    }

    pub fn checkin_transcript_dir(&self) -> PathBuf {
        self.data_dir.join("uploads/checkins/transcripts")
    }

    pub fn insurance_audio_dir(&self) -> PathBuf {
        self.data_dir.join("uploads/insurance/audio")
    }

    pub fn insurance_transcript_dir(&self) -> PathBuf {
        self.data_dir.join("uploads/insurance/transcripts")
    }

    pub fn prescription_dir(&self) -> PathBuf {
        self.data_dir.join("uploads/prescriptions")
    }

    pub fn lab_report_dir(&self) -> PathBuf {
        self.data_dir.join("uploads/lab_reports")
    }

    pub fn overall_report_dir(&self) -> PathBuf {
        self.data_dir.join("uploads/overall_reports")
    }

    /// Create every directory the service writes into.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        for dir in [
            self.checkin_audio_dir(),
            self.checkin_transcript_dir(),
            self.insurance_audio_dir(),
            self.insurance_transcript_dir(),
            self.prescription_dir(),
            self.lab_report_dir(),
            self.overall_report_dir(),
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

/// Default data directory: ~/Vitalink/ (user-visible)
fn default_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Vitalink")
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Default log filter when RUST_LOG is unset.
pub fn default_log_filter() -> &'static str {
    "info,vitalink=debug"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            data_dir: PathBuf::from("/tmp/vitalink-test"),
            agent_url: "http://localhost:5010".into(),
            vision_url: "https://generativelanguage.googleapis.com".into(),
            vision_api_key: String::new(),
            vision_model: "gemini-2.0-flash".into(),
            bind_addr: "127.0.0.1:8000".into(),
            transcriber: "whisperx".into(),
        }
    }

    #[test]
    fn upload_dirs_under_data_dir() {
        let cfg = test_config();
        assert!(cfg.checkin_audio_dir().starts_with(&cfg.data_dir));
        assert!(cfg.prescription_dir().starts_with(&cfg.data_dir));
        assert!(cfg.overall_report_dir().starts_with(&cfg.data_dir));
    }

    #[test]
    fn database_path_is_fixed_name() {
        let cfg = test_config();
        assert!(cfg.database_path().ends_with("vitalink.db"));
    }

    #[test]
    fn ensure_directories_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = test_config();
        cfg.data_dir = dir.path().to_path_buf();
        cfg.ensure_directories().unwrap();
        cfg.ensure_directories().unwrap();
        assert!(cfg.checkin_audio_dir().is_dir());
        assert!(cfg.lab_report_dir().is_dir());
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }
}
