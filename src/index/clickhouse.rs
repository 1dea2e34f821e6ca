//! Index lookups over the ClickHouse HTTP interface.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{ReportIndex, ReportKey};
use crate::archive::ArchiveCoordinates;
use crate::error::{ResolveError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClickhouseTables {
    /// Maps `measurement_uid` to `(report_id, input)`.
    pub uid_table: String,
    /// Maps `(report_id, input)` to archive coordinates.
    pub frames_table: String,
}

impl Default for ClickhouseTables {
    fn default() -> Self {
        Self {
            uid_table: "fastpath".to_string(),
            frames_table: "report_frames".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UidRow {
    report_id: String,
    #[serde(default)]
    input: Option<String>,
}

pub struct ClickhouseIndex {
    url: Url,
    database: Option<String>,
    uid_query: String,
    frames_query: String,
    client: Client,
}

impl ClickhouseIndex {
    pub fn new(
        url: &str,
        database: Option<String>,
        tables: &ClickhouseTables,
        timeout: Duration,
    ) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|err| ResolveError::SourceUnavailable(format!("invalid url {url}: {err}")))?;
        validate_table(&tables.uid_table)?;
        validate_table(&tables.frames_table)?;
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            url,
            database,
            uid_query: uid_query(&tables.uid_table),
            frames_query: frames_query(&tables.frames_table),
            client,
        })
    }

    fn query_one<T: DeserializeOwned>(&self, sql: &str, params: &[(&str, &str)]) -> Result<Option<T>> {
        let mut request = self
            .client
            .post(self.url.clone())
            .query(&[("output_format_json_quote_64bit_integers", "0")]);
        if let Some(database) = &self.database {
            request = request.query(&[("database", database.as_str())]);
        }
        for (name, value) in params {
            request = request.query(&[(format!("param_{name}"), *value)]);
        }

        let response = request.body(sql.to_string()).send()?;
        let status = response.status();
        if status != StatusCode::OK {
            let detail = response.text().unwrap_or_default();
            return Err(ResolveError::SourceUnavailable(format!(
                "clickhouse status {status}: {}",
                detail.trim()
            )));
        }

        let text = response.text()?;
        match text.lines().find(|line| !line.trim().is_empty()) {
            Some(line) => serde_json::from_str(line).map(Some).map_err(|err| {
                ResolveError::SourceUnavailable(format!("clickhouse row: {err}"))
            }),
            None => Ok(None),
        }
    }
}

impl ReportIndex for ClickhouseIndex {
    fn report_key_for_uid(&self, uid: &str) -> Result<Option<ReportKey>> {
        let row: Option<UidRow> = self.query_one(&self.uid_query, &[("uid", uid)])?;
        Ok(row.map(|row| ReportKey::new(row.report_id, row.input.as_deref())))
    }

    fn coordinates_for(&self, key: &ReportKey) -> Result<Option<ArchiveCoordinates>> {
        self.query_one(
            &self.frames_query,
            &[("report_id", key.report_id.as_str()), ("input", key.input.as_str())],
        )
    }
}

fn uid_query(table: &str) -> String {
    format!(
        "SELECT report_id, input FROM {table} \
         WHERE measurement_uid = {{uid:String}} LIMIT 1 FORMAT JSONEachRow"
    )
}

fn frames_query(table: &str) -> String {
    format!(
        "SELECT container_path, frame_byte_offset, frame_byte_length, \
         intra_frame_offset, logical_length FROM {table} \
         WHERE report_id = {{report_id:String}} AND input = {{input:String}} \
         LIMIT 1 FORMAT JSONEachRow"
    )
}

fn validate_table(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.');
    if !valid {
        return Err(ResolveError::SourceUnavailable(format!(
            "invalid table name: {name}"
        )));
    }
    Ok(())
}
