//! Inspection workflow
//!
//! Glue between a client session and the lower layers: credentials,
//! repository, evaluator, assistant and report renderer. Every operation
//! takes the caller's locked [`SessionContext`], so a session's actions
//! run one at a time.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::{info, warn};

use crate::auth::{AuthError, CredentialStore};
use crate::evaluator::{evaluate, Evaluation, EvaluationError};
use crate::llm::{suggestions_or_none, Assistant, AssistantError};
use crate::report::{InspectionReport, RenderedReport, ReportError, ReportRenderer};
use crate::session::{ChatEntry, PendingForm, SessionContext, SessionError};
use crate::storage::{inspections, machines, Database, StorageError};
use crate::types::{Inspection, InspectionStatus, Machine, Reaction, Shift};

/// Upper bound on inspections returned by one listing.
pub const MAX_LIST_LIMIT: u32 = 100;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
    #[error("Please evaluate before saving")]
    NotEvaluated,
    #[error("Message must not be empty")]
    EmptyMessage,
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Assistant unavailable: {0}")]
    Assistant(#[from] AssistantError),
    #[error(transparent)]
    Report(#[from] ReportError),
}

/// Outcome of saving the pending form.
#[derive(Debug, Clone, Serialize)]
pub struct SubmittedInspection {
    pub inspection_id: i64,
    pub status: InspectionStatus,
    pub date: NaiveDate,
    pub reaction_saved: bool,
    pub suggestions: Option<String>,
    /// `None` when rendering failed; the inspection is saved regardless.
    pub report: Option<RenderedReport>,
}

/// A stored inspection with its reaction.
#[derive(Debug, Clone, Serialize)]
pub struct InspectionDetail {
    pub inspection: Inspection,
    pub machine_name: String,
    pub reaction: Option<Reaction>,
}

pub struct InspectionService {
    db: Database,
    credentials: CredentialStore,
    assistant: Arc<dyn Assistant>,
    renderer: Arc<dyn ReportRenderer>,
}

impl InspectionService {
    pub fn new(
        db: Database,
        bcrypt_cost: u32,
        assistant: Arc<dyn Assistant>,
        renderer: Arc<dyn ReportRenderer>,
    ) -> Self {
        Self {
            credentials: CredentialStore::new(db.clone(), bcrypt_cost),
            db,
            assistant,
            renderer,
        }
    }

    pub const fn database(&self) -> &Database {
        &self.db
    }

    pub fn assistant_backend(&self) -> &'static str {
        self.assistant.backend_name()
    }

    // ------------------------------------------------------------------
    // Account
    // ------------------------------------------------------------------

    /// Create an account from the registration screen and log it in.
    pub async fn register(
        &self,
        ctx: &mut SessionContext,
        username: &str,
        password: &str,
    ) -> Result<i64, ServiceError> {
        ctx.ensure_can_register()?;
        let id = self.credentials.register(username, password).await?;
        ctx.register(id, username.trim())?;
        Ok(id)
    }

    pub async fn login(
        &self,
        ctx: &mut SessionContext,
        username: &str,
        password: &str,
    ) -> Result<i64, ServiceError> {
        ctx.ensure_can_login()?;
        let id = self.credentials.authenticate(username, password).await?;
        ctx.login(id, username.trim())?;
        info!(user_id = id, "User logged in");
        Ok(id)
    }

    pub fn logout(&self, ctx: &mut SessionContext) -> Result<(), ServiceError> {
        let user_id = ctx.user_id()?;
        ctx.logout()?;
        info!(user_id, "User logged out");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Inspections
    // ------------------------------------------------------------------

    pub async fn list_machines(&self, ctx: &SessionContext) -> Result<Vec<Machine>, ServiceError> {
        ctx.user_id()?;
        Ok(machines::list_machines(&self.db).await?)
    }

    /// Classify the entered values and keep the result as the session's
    /// pending form. Any earlier pending form is discarded first, so a
    /// rejected evaluation leaves nothing to save.
    pub async fn evaluate_form(
        &self,
        ctx: &mut SessionContext,
        machine_id: i64,
        shift: Shift,
        values: &[f64],
    ) -> Result<Evaluation, ServiceError> {
        ctx.user_id()?;
        ctx.take_pending();
        let machine = machines::get_machine(&self.db, machine_id).await?;
        let evaluation = evaluate(&machine, values)?;
        ctx.set_pending(PendingForm {
            evaluation: evaluation.clone(),
            shift,
        });
        Ok(evaluation)
    }

    /// Persist the pending form, then attach the reaction, suggestions and
    /// report. Only the inspection row itself is required to succeed.
    pub async fn submit_inspection(
        &self,
        ctx: &mut SessionContext,
        reaction: Option<&str>,
    ) -> Result<SubmittedInspection, ServiceError> {
        let user_id = ctx.user_id()?;
        let form = ctx.pending().cloned().ok_or(ServiceError::NotEvaluated)?;
        let evaluation = &form.evaluation;
        let measurements = evaluation.measurements();
        let date = Local::now().date_naive();

        let inspection_id = inspections::save_inspection(
            &self.db,
            &crate::types::NewInspection {
                user_id,
                machine_id: evaluation.machine_id,
                shift: form.shift,
                date,
                measurements: measurements.clone(),
                status: evaluation.status,
            },
        )
        .await?;
        ctx.take_pending();

        let reaction = reaction.map(str::trim).filter(|r| !r.is_empty());
        let reaction_saved = match reaction {
            Some(text) if evaluation.status.is_fail() => {
                match inspections::save_reaction(&self.db, inspection_id, text).await {
                    Ok(_) => true,
                    Err(e) => {
                        warn!(inspection_id, error = %e, "Failed to save reaction");
                        false
                    }
                }
            }
            Some(_) => {
                warn!(inspection_id, "Reaction ignored for passing inspection");
                false
            }
            None => false,
        };

        let suggestions =
            suggestions_or_none(self.assistant.as_ref(), &measurements, evaluation.status).await;

        let report = InspectionReport::from_evaluation(
            inspection_id,
            evaluation,
            form.shift,
            date,
            suggestions.clone(),
        );
        let report = match self.render(report).await {
            Ok(rendered) => Some(rendered),
            Err(e) => {
                warn!(inspection_id, error = %e, "Report rendering failed");
                None
            }
        };

        Ok(SubmittedInspection {
            inspection_id,
            status: evaluation.status,
            date,
            reaction_saved,
            suggestions,
            report,
        })
    }

    /// The caller's own inspections, newest first.
    pub async fn recent_inspections(
        &self,
        ctx: &SessionContext,
        limit: u32,
    ) -> Result<Vec<Inspection>, ServiceError> {
        let user_id = ctx.user_id()?;
        let limit = limit.clamp(1, MAX_LIST_LIMIT);
        Ok(inspections::list_inspections_for_user(&self.db, user_id, limit).await?)
    }

    pub async fn get_inspection(
        &self,
        ctx: &SessionContext,
        inspection_id: i64,
    ) -> Result<InspectionDetail, ServiceError> {
        ctx.user_id()?;
        let inspection = inspections::get_inspection(&self.db, inspection_id).await?;
        let machine = machines::get_machine(&self.db, inspection.machine_id).await?;
        let reaction = inspections::get_reaction(&self.db, inspection_id).await?;
        Ok(InspectionDetail {
            inspection,
            machine_name: machine.name,
            reaction,
        })
    }

    /// PDF bytes for a stored inspection. A missing file is re-rendered
    /// from the stored record, without suggestions.
    pub async fn report_pdf(
        &self,
        ctx: &SessionContext,
        inspection_id: i64,
    ) -> Result<Vec<u8>, ServiceError> {
        let detail = self.get_inspection(ctx, inspection_id).await?;
        let path = self.renderer.report_path(inspection_id);

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(inspection_id, "Report file missing, re-rendering");
                let report =
                    InspectionReport::from_inspection(&detail.inspection, detail.machine_name, None);
                let rendered = self.render(report).await?;
                Ok(tokio::fs::read(&rendered.path).await.map_err(ReportError::from)?)
            }
            Err(e) => Err(ReportError::from(e).into()),
        }
    }

    async fn render(&self, report: InspectionReport) -> Result<RenderedReport, ReportError> {
        let renderer = Arc::clone(&self.renderer);
        tokio::task::spawn_blocking(move || renderer.render(&report)).await?
    }

    // ------------------------------------------------------------------
    // Chat
    // ------------------------------------------------------------------

    pub async fn chat(&self, ctx: &mut SessionContext, text: &str) -> Result<String, ServiceError> {
        ctx.user_id()?;
        let text = text.trim();
        if text.is_empty() {
            return Err(ServiceError::EmptyMessage);
        }
        let reply = self.assistant.chat_reply(text).await?;
        ctx.push_chat(text, reply.clone());
        Ok(reply)
    }

    pub fn chat_history(&self, ctx: &SessionContext) -> Result<Vec<ChatEntry>, ServiceError> {
        ctx.user_id()?;
        Ok(ctx.chat_history().to_vec())
    }
}
