use std::collections::BTreeMap;

use url::Url;

use crate::domain::report::{
    ActualFacts, AspectRecord, Report, ResponseAspect, SpecReport, ValidationReport,
    ValidatorResult,
};
use crate::domain::response::Response;
use crate::engine::diff::consolidate;

#[derive(Debug, Clone)]
pub struct ExpectationResults {
    pub response: Response,
    pub results: Vec<ValidatorResult>,
}

impl ExpectationResults {
    pub fn new(response: Response, results: Vec<ValidatorResult>) -> Self {
        Self { response, results }
    }

    pub fn merge(&mut self, other: ExpectationResults) {
        self.results.extend(other.results);
    }

    pub fn report(&self) -> Report {
        let mut expected: BTreeMap<ResponseAspect, AspectRecord> = BTreeMap::new();
        for result in &self.results {
            let key = result.key;
            let record = AspectRecord::from(result.clone());
            match expected.get_mut(&key) {
                Some(existing) => merge_records(existing, record),
                None => {
                    expected.insert(key, record);
                }
            }
        }
        for record in expected.values_mut() {
            record.diff = consolidate(std::mem::take(&mut record.diff));
        }

        Report {
            valid: expected.values().all(|record| record.valid),
            expected,
            actual: actual_facts(&self.response),
        }
    }
}

fn merge_records(into: &mut AspectRecord, other: AspectRecord) {
    into.assertions.extend(other.assertions);
    into.failed_assertions.extend(other.failed_assertions);
    into.diff.extend(other.diff);
    into.errors.extend(other.errors);
    into.valid = into.valid && other.valid;
}

fn actual_facts(response: &Response) -> ActualFacts {
    let request = &response.request;
    let parsed = parse_request_url(&request.url);
    ActualFacts {
        request_headers: request.headers.clone(),
        request_body: request.body.clone(),
        request_path: parsed
            .as_ref()
            .map(|url| url.path().to_string())
            .unwrap_or_else(|| strip_query(&request.url).to_string()),
        request_params: parsed.as_ref().and_then(|url| url.query()).map(parse_params),
        request_url: request.url.clone(),
        request_method: request.method.to_uppercase(),
        response_headers: response.headers.clone(),
        response_body: response.body.clone(),
        response_status: response.status,
    }
}

/// Relative request targets (`/users?page=2`) are resolved against a
/// placeholder origin so path and query can still be split.
fn parse_request_url(raw: &str) -> Option<Url> {
    if raw.is_empty() {
        return None;
    }
    Url::parse(raw)
        .or_else(|_| Url::parse("http://localhost/").and_then(|base| base.join(raw)))
        .ok()
}

fn strip_query(raw: &str) -> &str {
    raw.split(['?', '#']).next().unwrap_or(raw)
}

/// Flat `key -> value` view of a raw query string; later keys win.
///
/// A value ends at the next `=`, and trailing empty pieces are dropped, so
/// `a=b=c` maps to `b` and `a=` has no value.
fn parse_params(query: &str) -> BTreeMap<String, Option<String>> {
    let mut params = BTreeMap::new();
    for part in query.split('&').filter(|part| !part.is_empty()) {
        let mut pieces: Vec<&str> = part.split('=').collect();
        while pieces.last().is_some_and(|piece| piece.is_empty()) {
            pieces.pop();
        }
        let key = pieces.first().copied().unwrap_or_default().to_string();
        let value = pieces.get(1).map(|value| (*value).to_string());
        params.insert(key, value);
    }
    params
}

/// Results accumulated across a validation subtree.
///
/// Expectations that captured equal responses share one entry, so aspects are
/// merged and diffs consolidated across every validation that checked it.
#[derive(Debug, Clone, Default)]
pub struct SpecResults {
    entries: Vec<SpecEntry>,
    pending: Vec<String>,
}

#[derive(Debug, Clone)]
struct SpecEntry {
    validations: Vec<String>,
    results: ExpectationResults,
}

impl SpecResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, validation: impl Into<String>, results: ExpectationResults) {
        self.absorb(vec![validation.into()], results);
    }

    pub fn mark_pending(&mut self, validation: impl Into<String>) {
        self.pending.push(validation.into());
    }

    pub fn merge(&mut self, other: SpecResults) {
        for entry in other.entries {
            self.absorb(entry.validations, entry.results);
        }
        self.pending.extend(other.pending);
    }

    fn absorb(&mut self, validations: Vec<String>, results: ExpectationResults) {
        let existing = self
            .entries
            .iter_mut()
            .find(|entry| entry.results.response == results.response);
        match existing {
            Some(entry) => {
                for validation in validations {
                    if !entry.validations.contains(&validation) {
                        entry.validations.push(validation);
                    }
                }
                entry.results.merge(results);
            }
            None => self.entries.push(SpecEntry {
                validations,
                results,
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn valid(&self) -> bool {
        self.entries
            .iter()
            .all(|entry| entry.results.results.iter().all(|result| result.valid))
    }

    pub fn into_report(self) -> SpecReport {
        let valid = self.valid();
        let results = self
            .entries
            .into_iter()
            .map(|entry| ValidationReport {
                report: entry.results.report(),
                validations: entry.validations,
            })
            .collect();
        SpecReport {
            valid,
            results,
            pending: self.pending,
        }
    }
}
