use crate::config::{AuthConfig, DEFAULT_ADMIN_PASSWORD, DEFAULT_CODE_PREFIX};
use crate::database::{DynStore, Table, fetch_all, require_by_id};
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::{ContentService, OutboxService};
use crate::utils::{generate_access_code, generate_id, validate_phone};
use serde_json::json;
use std::sync::Arc;

/// 生成唯一访问码的最大尝试次数
const MAX_CODE_ATTEMPTS: usize = 50;

/// Decide who `presented` lets in. The master password wins over any customer code
/// with the same value; inactive records never match.
pub fn verify(
    presented: &str,
    admin_password: &str,
    known_codes: &[CustomerCode],
) -> AppResult<Session> {
    let presented = presented.trim();
    if presented.is_empty() {
        return Err(AppError::NotAuthorized);
    }
    if presented == admin_password {
        return Ok(Session::admin());
    }
    known_codes
        .iter()
        .find(|c| c.matches(presented))
        .map(|c| Session::customer(c.clone()))
        .ok_or(AppError::NotAuthorized)
}

#[derive(Clone)]
pub struct AccessService {
    store: DynStore,
    outbox: Arc<OutboxService>,
    content: ContentService,
    auth: AuthConfig,
}

impl AccessService {
    pub fn new(
        store: DynStore,
        outbox: Arc<OutboxService>,
        content: ContentService,
        auth: AuthConfig,
    ) -> Self {
        Self {
            store,
            outbox,
            content,
            auth,
        }
    }

    async fn stored_content(&self) -> Option<AppContent> {
        match self.content.stored().await {
            Ok(content) => content,
            Err(e) => {
                log::warn!("Could not read app content, falling back to config: {e}");
                None
            }
        }
    }

    /// Stored content first, then config, then the built-in default. The default only
    /// applies when no password is set anywhere; if the stored row cannot be read, only
    /// a configured password may stand in for it.
    pub async fn resolve_admin_password(&self) -> AppResult<String> {
        let configured = first_non_empty([self.auth.admin_password.clone()]);
        match self.content.stored().await {
            Ok(stored) => Ok(first_non_empty([stored.and_then(|c| c.admin_password), configured])
                .unwrap_or_else(|| DEFAULT_ADMIN_PASSWORD.to_string())),
            Err(e) => {
                log::warn!("Could not read app content for the admin password: {e}");
                configured.ok_or(e)
            }
        }
    }

    pub async fn resolve_prefix(&self) -> String {
        let stored = self.stored_content().await.map(|c| c.code_prefix);
        first_non_empty([stored, Some(self.auth.code_prefix.clone())])
            .unwrap_or_else(|| DEFAULT_CODE_PREFIX.to_string())
    }

    async fn load_codes(&self) -> AppResult<Vec<CustomerCode>> {
        fetch_all(self.store.as_ref(), Table::CustomerCodes).await
    }

    pub async fn verify_code(&self, presented: &str) -> AppResult<Session> {
        let admin_password = self.resolve_admin_password().await?;
        let codes = match self.load_codes().await {
            Ok(codes) => codes,
            // 后端不可用时管理员仍可登录
            Err(e) if e.is_store_unavailable() && presented.trim() == admin_password => {
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let session = verify(presented, &admin_password, &codes)?;
        log::info!(
            "Access granted: role={}, code_id={}",
            session.role,
            session.customer_id().unwrap_or("-")
        );
        Ok(session)
    }

    /// Reload the record a customer session is bound to; it must still be active.
    pub async fn active_customer(&self, code_id: &str) -> AppResult<CustomerCode> {
        let code: CustomerCode = require_by_id(self.store.as_ref(), Table::CustomerCodes, code_id)
            .await
            .map_err(|e| match e {
                AppError::NotFound(_) => AppError::NotAuthorized,
                other => other,
            })?;
        if !code.is_active {
            return Err(AppError::NotAuthorized);
        }
        Ok(code)
    }

    pub async fn request_access(
        &self,
        name: &str,
        phone: Option<&str>,
    ) -> AppResult<RequestAccessResponse> {
        let (name, phone) = validate_contact(name, phone)?;

        let record = CustomerCode::pending(generate_id("C"), name, phone);
        let delivered = self
            .outbox
            .save_or_enqueue(self.store.as_ref(), Table::CustomerCodes, &record, &record.id)
            .await?;

        log::info!(
            "Access requested: id={}, delivered={delivered}",
            record.id
        );
        Ok(RequestAccessResponse {
            id: record.id,
            status: record.status,
        })
    }

    /// Admin card generator: create an approved, active code in one step.
    pub async fn issue(&self, request: IssueCodeRequest) -> AppResult<CustomerCode> {
        let (name, phone) = validate_contact(&request.customer_name, request.user_phone.as_deref())?;
        let codes = self.load_codes().await.unwrap_or_else(|e| {
            log::warn!("Issuing code without uniqueness check: {e}");
            Vec::new()
        });

        let mut record = CustomerCode::pending(generate_id("C"), name, phone);
        record.code = self.unique_code(&codes).await?;
        record.status = CodeStatus::Approved;
        record.is_active = true;

        self.outbox
            .save_or_enqueue(self.store.as_ref(), Table::CustomerCodes, &record, &record.id)
            .await?;
        log::info!("Access code issued: id={}", record.id);
        Ok(record)
    }

    /// Assign a fresh code and activate. Allowed from any state.
    pub async fn approve(&self, code_id: &str) -> AppResult<CustomerCode> {
        let codes = self.load_codes().await?;
        let mut record = find_code(&codes, code_id)?;
        let code = self.unique_code(&codes).await?;

        self.store
            .update(
                Table::CustomerCodes,
                json!({
                    "status": CodeStatus::Approved,
                    "isActive": true,
                    "code": code,
                }),
                code_id,
            )
            .await?;

        record.code = code;
        record.status = CodeStatus::Approved;
        record.is_active = true;
        log::info!("Access code approved: id={code_id}");
        Ok(record)
    }

    pub async fn block(&self, code_id: &str) -> AppResult<CustomerCode> {
        let mut record: CustomerCode =
            require_by_id(self.store.as_ref(), Table::CustomerCodes, code_id).await?;
        if record.status != CodeStatus::Approved {
            return Err(AppError::InvalidTransition(format!(
                "cannot block a {} code",
                record.status
            )));
        }

        self.store
            .update(
                Table::CustomerCodes,
                json!({
                    "status": CodeStatus::Blocked,
                    "isActive": false,
                    "code": BLOCKED_CODE,
                }),
                code_id,
            )
            .await?;

        record.code = BLOCKED_CODE.to_string();
        record.status = CodeStatus::Blocked;
        record.is_active = false;
        log::info!("Access code blocked: id={code_id}");
        Ok(record)
    }

    pub async fn reactivate(&self, code_id: &str) -> AppResult<CustomerCode> {
        let codes = self.load_codes().await?;
        let record = find_code(&codes, code_id)?;
        if record.status != CodeStatus::Blocked {
            return Err(AppError::InvalidTransition(format!(
                "cannot reactivate a {} code",
                record.status
            )));
        }
        self.approve(code_id).await
    }

    /// Hard delete. Rejecting a pending request goes through here too.
    pub async fn delete(&self, code_id: &str) -> AppResult<()> {
        let record: CustomerCode =
            require_by_id(self.store.as_ref(), Table::CustomerCodes, code_id).await?;
        self.store.delete(Table::CustomerCodes, code_id).await?;
        log::info!(
            "Access code deleted: id={code_id}, was {}",
            record.status
        );
        Ok(())
    }

    pub async fn get_code(&self, code_id: &str) -> AppResult<CustomerCode> {
        require_by_id(self.store.as_ref(), Table::CustomerCodes, code_id).await
    }

    /// Newest first, optionally filtered by status.
    pub async fn list_codes(&self, query: &CodeQuery) -> AppResult<PaginatedResponse<CustomerCode>> {
        let mut codes = self.load_codes().await?;
        if let Some(status) = query.status {
            codes.retain(|c| c.status == status);
        }
        codes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(PaginationParams::new(query.page, query.per_page).paginate(codes))
    }

    async fn unique_code(&self, codes: &[CustomerCode]) -> AppResult<String> {
        let prefix = self.resolve_prefix().await;
        for _ in 0..MAX_CODE_ATTEMPTS {
            let candidate = generate_access_code(&prefix);
            if !codes.iter().any(|c| c.is_active && c.code == candidate) {
                return Ok(candidate);
            }
        }
        Err(AppError::InternalError(format!(
            "no free {prefix} code after {MAX_CODE_ATTEMPTS} attempts"
        )))
    }
}

fn first_non_empty<const N: usize>(candidates: [Option<String>; N]) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

fn find_code(codes: &[CustomerCode], code_id: &str) -> AppResult<CustomerCode> {
    codes
        .iter()
        .find(|c| c.id == code_id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Access code {code_id} not found")))
}

fn validate_contact(name: &str, phone: Option<&str>) -> AppResult<(String, Option<String>)> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::ValidationError("Name is required".to_string()));
    }
    let phone = match phone.map(str::trim).filter(|p| !p.is_empty()) {
        Some(p) => Some(validate_phone(p)?),
        None => None,
    };
    Ok((name.to_string(), phone))
}
