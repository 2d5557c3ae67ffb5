//! Uploads command-log records to the server's HTTP API

use shared::{CommandLog, NewCommandLog, LOGS_PATH};

pub type ReportError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Clone)]
pub struct LogReporter {
    http: reqwest::Client,
    url: String,
}

impl LogReporter {
    /// `base` is the server origin, e.g. `http://127.0.0.1:5000`.
    pub fn new(base: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: format!("{}{}", base.trim_end_matches('/'), LOGS_PATH),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn report(&self, entry: &NewCommandLog) -> Result<CommandLog, ReportError> {
        let stored = self
            .http
            .post(&self.url)
            .json(entry)
            .send()
            .await?
            .error_for_status()?
            .json::<CommandLog>()
            .await?;
        Ok(stored)
    }

    pub async fn fetch_all(&self) -> Result<Vec<CommandLog>, ReportError> {
        let logs = self
            .http
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<CommandLog>>()
            .await?;
        Ok(logs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_logs_path() {
        assert_eq!(
            LogReporter::new("http://127.0.0.1:5000").url(),
            "http://127.0.0.1:5000/api/logs"
        );
        assert_eq!(
            LogReporter::new("http://localhost:8080/").url(),
            "http://localhost:8080/api/logs"
        );
    }
}
