//! In-memory fakes of the provider traits.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};
use std::time::Duration;

use dailytracker_providers::{
    AppendRequest, AppendSummary, BoxFuture, IdentityProvider, Prompt, ProviderError,
    ProviderResult, SpreadsheetFile, SpreadsheetStore, TokenGrant,
};
use serde_json::Value;

/// Identity provider that hands out numbered tokens.
pub struct FakeIdentity {
    requests: Mutex<Vec<Prompt>>,
    revoked: Mutex<Vec<String>>,
    has_grant: AtomicBool,
    fail_requests: AtomicBool,
    fail_revoke: AtomicBool,
    expires_in: AtomicI64,
    issued: AtomicU32,
    delay: Option<Duration>,
}

impl FakeIdentity {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            revoked: Mutex::new(Vec::new()),
            has_grant: AtomicBool::new(false),
            fail_requests: AtomicBool::new(false),
            fail_revoke: AtomicBool::new(false),
            expires_in: AtomicI64::new(3600),
            issued: AtomicU32::new(0),
            delay: None,
        }
    }

    pub fn with_grant(self) -> Self {
        self.has_grant.store(true, Ordering::SeqCst);
        self
    }

    /// Makes every token request sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_expires_in(&self, secs: i64) {
        self.expires_in.store(secs, Ordering::SeqCst);
    }

    pub fn fail_requests(&self, fail: bool) {
        self.fail_requests.store(fail, Ordering::SeqCst);
    }

    pub fn fail_revoke(&self, fail: bool) {
        self.fail_revoke.store(fail, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<Prompt> {
        self.requests.lock().unwrap().clone()
    }

    pub fn revoked(&self) -> Vec<String> {
        self.revoked.lock().unwrap().clone()
    }
}

impl IdentityProvider for FakeIdentity {
    fn name(&self) -> &str {
        "fake-identity"
    }

    fn request_access_token(&self, prompt: Prompt) -> BoxFuture<'_, ProviderResult<TokenGrant>> {
        Box::pin(async move {
            self.requests.lock().unwrap().push(prompt);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_requests.load(Ordering::SeqCst) {
                return Err(ProviderError::authentication("user closed the consent window"));
            }
            if prompt == Prompt::None && !self.has_grant.load(Ordering::SeqCst) {
                return Err(ProviderError::authentication("no standing grant"));
            }
            self.has_grant.store(true, Ordering::SeqCst);
            let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(TokenGrant::new(
                format!("token-{}", n),
                self.expires_in.load(Ordering::SeqCst),
            ))
        })
    }

    fn revoke(&self, access_token: &str) -> BoxFuture<'_, ProviderResult<()>> {
        let access_token = access_token.to_string();
        Box::pin(async move {
            self.revoked.lock().unwrap().push(access_token);
            self.has_grant.store(false, Ordering::SeqCst);
            if self.fail_revoke.load(Ordering::SeqCst) {
                return Err(ProviderError::network("revoke endpoint unreachable"));
            }
            Ok(())
        })
    }

    fn has_grant(&self) -> bool {
        self.has_grant.load(Ordering::SeqCst)
    }
}

/// A call observed by [`FakeSheets`].
#[derive(Debug, Clone, PartialEq)]
pub enum SheetCall {
    Find { token: String, name: String },
    Create { token: String, title: String },
    Append { token: String, spreadsheet_id: String, range: String, rows: Vec<Vec<Value>> },
}

/// Spreadsheet store keeping files in memory and recording every call.
pub struct FakeSheets {
    calls: Mutex<Vec<SheetCall>>,
    files: Mutex<Vec<SpreadsheetFile>>,
    fail: Mutex<Option<&'static str>>,
}

impl FakeSheets {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            files: Mutex::new(Vec::new()),
            fail: Mutex::new(None),
        }
    }

    pub fn with_file(self, id: &str, name: &str) -> Self {
        self.files.lock().unwrap().push(SpreadsheetFile::new(id, name));
        self
    }

    /// Makes the named call ("find", "create" or "append") fail.
    pub fn fail_on(&self, call: &'static str) {
        *self.fail.lock().unwrap() = Some(call);
    }

    pub fn calls(&self) -> Vec<SheetCall> {
        self.calls.lock().unwrap().clone()
    }

    fn check(&self, call: &str) -> ProviderResult<()> {
        match *self.fail.lock().unwrap() {
            Some(failing) if failing == call => Err(ProviderError::server("backend error")),
            _ => Ok(()),
        }
    }
}

impl SpreadsheetStore for FakeSheets {
    fn name(&self) -> &str {
        "fake-sheets"
    }

    fn find_by_name<'a>(
        &'a self,
        access_token: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, ProviderResult<Vec<SpreadsheetFile>>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(SheetCall::Find {
                token: access_token.to_string(),
                name: name.to_string(),
            });
            self.check("find")?;
            Ok(self
                .files
                .lock()
                .unwrap()
                .iter()
                .filter(|f| f.name == name)
                .cloned()
                .collect())
        })
    }

    fn create<'a>(
        &'a self,
        access_token: &'a str,
        title: &'a str,
    ) -> BoxFuture<'a, ProviderResult<String>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(SheetCall::Create {
                token: access_token.to_string(),
                title: title.to_string(),
            });
            self.check("create")?;
            let mut files = self.files.lock().unwrap();
            let id = format!("sheet-{}", files.len() + 1);
            files.push(SpreadsheetFile::new(id.clone(), title));
            Ok(id)
        })
    }

    fn append<'a>(
        &'a self,
        access_token: &'a str,
        request: AppendRequest,
    ) -> BoxFuture<'a, ProviderResult<AppendSummary>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(SheetCall::Append {
                token: access_token.to_string(),
                spreadsheet_id: request.spreadsheet_id.clone(),
                range: request.range.clone(),
                rows: request.rows.clone(),
            });
            self.check("append")?;
            Ok(AppendSummary {
                updated_range: Some("Sheet1!A2:K2".to_string()),
                updated_rows: request.rows.len() as u32,
            })
        })
    }
}
