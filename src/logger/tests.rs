//! Tests for the logger module

use std::io::Write;
use std::path::PathBuf;

use tracing_subscriber::fmt::MakeWriter;

use crate::logger::config::*;
use crate::logger::writer::RotatingFileWriter;

fn file_config(path: PathBuf, max_size: u64, max_files: usize) -> FileConfig {
    FileConfig {
        enabled: true,
        path,
        append: true,
        format: LogFormat::Full,
        max_size,
        max_files,
    }
}

mod config_tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = LoggerConfig::default();
        assert!(config.console.enabled);
        assert!(!config.file.enabled);
        assert_eq!(config.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_both_outputs_disabled_is_rejected() {
        let mut config = LoggerConfig::default();
        config.console.enabled = false;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_level_is_rejected() {
        let config = LoggerConfig {
            level: "loud".to_string(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("loud"));
    }

    #[test]
    fn test_level_parsing_is_case_insensitive() {
        assert_eq!(parse_level("WARN").unwrap(), tracing::Level::WARN);
        assert_eq!(parse_level("debug").unwrap(), tracing::Level::DEBUG);
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!("xml".parse::<LogFormat>().is_err());
        assert_eq!(LogFormat::Full.to_string(), "full");
    }

    #[test]
    fn test_enabled_file_needs_limits() {
        let mut file = file_config(PathBuf::from("app.log"), 0, 3);
        assert!(file.validate().is_err());
        file.max_size = 1024;
        file.max_files = 0;
        assert!(file.validate().is_err());
        file.max_files = 1;
        assert!(file.validate().is_ok());
    }
}

mod writer_tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_writer_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("app.log");
        let writer = RotatingFileWriter::new(&file_config(path.clone(), 1024, 2)).unwrap();

        writer.make_writer().write_all(b"hello\n").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\n");
    }

    #[test]
    fn test_writer_rotates_by_size() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        let writer = RotatingFileWriter::new(&file_config(path.clone(), 10, 2)).unwrap();

        for line in ["first-line\n", "second-line\n", "third-line\n", "fourth-line\n"] {
            writer.make_writer().write_all(line.as_bytes()).unwrap();
        }

        let rotated = |n: usize| dir.path().join(format!("app.log.{n}"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "fourth-line\n");
        assert_eq!(std::fs::read_to_string(rotated(1)).unwrap(), "third-line\n");
        assert_eq!(std::fs::read_to_string(rotated(2)).unwrap(), "second-line\n");
        assert!(!rotated(3).exists());
    }

    #[test]
    fn test_truncate_when_not_appending() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        std::fs::write(&path, "stale\n").unwrap();

        let mut config = file_config(path.clone(), 1024, 1);
        config.append = false;
        let writer = RotatingFileWriter::new(&config).unwrap();
        writer.make_writer().write_all(b"fresh\n").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "fresh\n");
    }
}
