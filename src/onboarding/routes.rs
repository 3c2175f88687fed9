//! HTTP surface of the onboarding workflow.
//!
//! Every URL is scoped to one account: `/accounts/{account_id}/onboarding/...`.
//! Task input pages sit behind the access gate; the task list does not.

use std::sync::Arc;

use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Form, FromRequestParts, Multipart, Path, Request, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;
use indexmap::IndexMap;
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::commit::{CommitCoordinator, CommitOutcome, PageErrors};
use super::draft::{Draft, DraftAccumulator, DraftKey};
use super::gate::{self, GateState, guard};
use super::projector::{prerequisites_complete, project};
use super::registry::{Task, TaskName, TaskRegistry, onboarding_root};
use super::responsible_person::{
    AddressForm, ContactForm, NameForm, ResponsiblePersonPage, SectionForm, first_missing_page,
};
use super::simple_tasks::{
    BankAccountForm, CompanyNumberForm, DOCUMENT_FIELD, DOCUMENT_TEMPLATE, DirectorForm,
    MAX_DOCUMENT_BYTES, OrganisationDetailsForm, TaskForm, VatNumberForm, validate_document,
};
use super::view::{PageView, PortalError};
use crate::accounts::AccountService;
use crate::provider::PspProvider;
use crate::store::SessionStore;
use crate::validation::FieldErrors;

/// Header the session layer uses to identify the actor.
pub const SESSION_HEADER: &str = "x-session-id";

/// Path parameters shared by every onboarding route.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountPath {
    pub account_id: String,
}

/// Shared state for onboarding routes.
#[derive(Clone)]
pub struct AppState {
    pub registry: &'static TaskRegistry,
    pub accounts: Arc<dyn AccountService>,
    pub drafts: DraftAccumulator,
    pub coordinator: CommitCoordinator,
}

impl AppState {
    pub fn new(
        store: Arc<dyn SessionStore>,
        accounts: Arc<dyn AccountService>,
        provider: Arc<dyn PspProvider>,
    ) -> Self {
        let drafts = DraftAccumulator::new(store);
        let coordinator = CommitCoordinator::new(drafts.clone(), provider, Arc::clone(&accounts));
        Self {
            registry: TaskRegistry::standard(),
            accounts,
            drafts,
            coordinator,
        }
    }
}

/// The actor behind a request, taken from the session header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor(pub String);

fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl<S: Send + Sync> FromRequestParts<S> for Actor {
    type Rejection = PortalError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        session_id(&parts.headers)
            .map(Actor)
            .ok_or(PortalError::MissingSession)
    }
}

/// Reject session-less requests before any workflow code runs.
async fn require_session(request: Request, next: Next) -> Result<Response, PortalError> {
    if session_id(request.headers()).is_none() {
        return Err(PortalError::MissingSession);
    }
    Ok(next.run(request).await)
}

fn task_route(task: &Task) -> String {
    format!("/accounts/{{account_id}}/onboarding/{}", task.page_path)
}

fn redirect_to(href: &str) -> Response {
    Redirect::to(href).into_response()
}

/// Put `router` behind the access gate for `task`.
fn gated(state: &AppState, task: TaskName, router: Router<AppState>) -> Router<AppState> {
    let gate_state = GateState {
        gate: guard(task),
        accounts: Arc::clone(&state.accounts),
    };
    router.route_layer(middleware::from_fn_with_state(gate_state, gate::enforce))
}

// ── Task list ───────────────────────────────────────────────────────────

async fn task_list(
    State(state): State<AppState>,
    Path(path): Path<AccountPath>,
) -> Result<PageView, PortalError> {
    let progress = state.accounts.onboarding_progress(&path.account_id).await?;
    let tasks = project(state.registry, progress.as_ref(), &path.account_id);
    Ok(PageView::new("onboarding/tasks")
        .with("accountId", &path.account_id)
        .with("tasks", &tasks))
}

// ── Single-page tasks ───────────────────────────────────────────────────

fn task_page<F: TaskForm>(
    account_id: &str,
    form: &F,
    errors: Option<&FieldErrors>,
    summary: Option<&str>,
) -> PageView {
    PageView::new(F::TEMPLATE)
        .with("form", form)
        .with("errors", errors)
        .with("errorSummary", summary)
        .with("tasksHref", onboarding_root(account_id))
}

async fn show_task<F: TaskForm>(Path(path): Path<AccountPath>) -> PageView {
    task_page(&path.account_id, &F::default(), None, None)
}

async fn submit_task<F: TaskForm>(
    State(state): State<AppState>,
    Path(path): Path<AccountPath>,
    Form(form): Form<F>,
) -> Result<Response, PortalError> {
    let account_id = &path.account_id;
    let payload = match form.validate() {
        Ok(payload) => payload,
        Err(errors) => return Ok(task_page(account_id, &form, Some(&errors), None).into_response()),
    };

    let outcome = state
        .coordinator
        .submit(account_id, F::TASK, |provider, psp_account_id| async move {
            F::send(provider.as_ref(), &psp_account_id, &payload).await
        })
        .await?;

    match outcome {
        Ok(()) => Ok(redirect_to(&onboarding_root(account_id))),
        Err(failure) => {
            let PageErrors { fields, summary } = failure.page_errors(F::FIELDS);
            Ok(task_page(account_id, &form, Some(&fields), summary).into_response())
        }
    }
}

fn single_page<F: TaskForm>(state: &AppState) -> Router<AppState> {
    let Some(task) = state.registry.get(F::TASK) else {
        return Router::new();
    };
    let router = Router::new().route(
        &task_route(task),
        get(show_task::<F>).post(submit_task::<F>),
    );
    gated(state, F::TASK, router)
}

// ── Responsible person ──────────────────────────────────────────────────

fn draft_key(actor: Actor, account_id: &str) -> DraftKey {
    DraftKey::new(actor.0, account_id, TaskName::ResponsiblePerson)
}

fn section_page<F: SectionForm>(account_id: &str, form: &F, errors: Option<&FieldErrors>) -> PageView {
    PageView::new(F::PAGE.template())
        .with("form", form)
        .with("errors", errors)
        .with("tasksHref", onboarding_root(account_id))
}

async fn show_section<F: SectionForm>(
    State(state): State<AppState>,
    Path(path): Path<AccountPath>,
    actor: Actor,
) -> Result<PageView, PortalError> {
    let draft = state.drafts.read(&draft_key(actor, &path.account_id)).await?;
    Ok(section_page(&path.account_id, &F::from_draft(&draft), None))
}

async fn save_section<F: SectionForm>(
    State(state): State<AppState>,
    Path(path): Path<AccountPath>,
    actor: Actor,
    Form(form): Form<F>,
) -> Result<Response, PortalError> {
    let updates = match form.validate() {
        Ok(updates) => updates,
        Err(errors) => {
            return Ok(section_page(&path.account_id, &form, Some(&errors)).into_response());
        }
    };
    state
        .drafts
        .merge(&draft_key(actor, &path.account_id), updates)
        .await?;
    let next = F::PAGE.next().unwrap_or(ResponsiblePersonPage::CheckAnswers);
    Ok(redirect_to(&next.href(&path.account_id)))
}

fn check_answers_page(account_id: &str, draft: &Draft, errors: Option<&PageErrors>) -> PageView {
    let change_links: IndexMap<ResponsiblePersonPage, String> = ResponsiblePersonPage::ALL
        .iter()
        .filter(|page| page.next().is_some())
        .map(|page| (*page, page.href(account_id)))
        .collect();
    PageView::new(ResponsiblePersonPage::CheckAnswers.template())
        .with("answers", draft)
        .with("changeLinks", change_links)
        .with("errors", errors.map(|e| &e.fields))
        .with("errorSummary", errors.and_then(|e| e.summary))
        .with("tasksHref", onboarding_root(account_id))
}

async fn show_answers(
    State(state): State<AppState>,
    Path(path): Path<AccountPath>,
    actor: Actor,
) -> Result<Response, PortalError> {
    let draft = state.drafts.read(&draft_key(actor, &path.account_id)).await?;
    if let Some(page) = first_missing_page(&draft) {
        return Ok(redirect_to(&page.href(&path.account_id)));
    }
    Ok(check_answers_page(&path.account_id, &draft, None).into_response())
}

async fn submit_answers(
    State(state): State<AppState>,
    Path(path): Path<AccountPath>,
    actor: Actor,
) -> Result<Response, PortalError> {
    let key = draft_key(actor, &path.account_id);
    match state.coordinator.commit(&key).await? {
        CommitOutcome::Committed => Ok(redirect_to(&onboarding_root(&path.account_id))),
        CommitOutcome::Incomplete(page) => Ok(redirect_to(&page.href(&path.account_id))),
        CommitOutcome::Rejected(failure) => {
            let draft = state.drafts.read(&key).await?;
            let errors = failure.page_errors(ResponsiblePersonPage::CheckAnswers.fields());
            Ok(check_answers_page(&path.account_id, &draft, Some(&errors)).into_response())
        }
    }
}

fn responsible_person_routes(state: &AppState) -> Router<AppState> {
    let Some(task) = state.registry.get(TaskName::ResponsiblePerson) else {
        return Router::new();
    };
    let base = task_route(task);
    let at = |page: ResponsiblePersonPage| format!("{base}{}", page.segment());

    let router = Router::new()
        .route(
            &at(ResponsiblePersonPage::Name),
            get(show_section::<NameForm>).post(save_section::<NameForm>),
        )
        .route(
            &at(ResponsiblePersonPage::HomeAddress),
            get(show_section::<AddressForm>).post(save_section::<AddressForm>),
        )
        .route(
            &at(ResponsiblePersonPage::ContactDetails),
            get(show_section::<ContactForm>).post(save_section::<ContactForm>),
        )
        .route(
            &at(ResponsiblePersonPage::CheckAnswers),
            get(show_answers).post(submit_answers),
        );
    gated(state, TaskName::ResponsiblePerson, router)
}

// ── Government entity document ──────────────────────────────────────────

#[derive(Debug, Default)]
struct Upload {
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

async fn read_upload(multipart: &mut Multipart) -> Result<Upload, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(DOCUMENT_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?.to_vec();
        return Ok(Upload {
            file_name,
            content_type,
            bytes,
        });
    }
    Ok(Upload::default())
}

fn document_page(account_id: &str, errors: Option<&FieldErrors>, summary: Option<&str>) -> PageView {
    PageView::new(DOCUMENT_TEMPLATE)
        .with("errors", errors)
        .with("errorSummary", summary)
        .with("tasksHref", onboarding_root(account_id))
}

/// Redirect to the task list while the terminal task is still disabled.
async fn unless_prerequisites_met(
    state: &AppState,
    account_id: &str,
) -> Result<Option<Response>, PortalError> {
    let progress = state.accounts.onboarding_progress(account_id).await?;
    if prerequisites_complete(state.registry, progress.as_ref()) {
        return Ok(None);
    }
    info!(account_id = %account_id, "Document upload not yet available");
    Ok(Some(redirect_to(&onboarding_root(account_id))))
}

async fn show_document(
    State(state): State<AppState>,
    Path(path): Path<AccountPath>,
) -> Result<Response, PortalError> {
    if let Some(redirect) = unless_prerequisites_met(&state, &path.account_id).await? {
        return Ok(redirect);
    }
    Ok(document_page(&path.account_id, None, None).into_response())
}

async fn upload_document(
    State(state): State<AppState>,
    Path(path): Path<AccountPath>,
    mut multipart: Multipart,
) -> Result<Response, PortalError> {
    let account_id = &path.account_id;
    if let Some(redirect) = unless_prerequisites_met(&state, account_id).await? {
        return Ok(redirect);
    }

    let upload = match read_upload(&mut multipart).await {
        Ok(upload) => upload,
        Err(e) => {
            warn!(account_id = %account_id, error = %e, "Unreadable document upload");
            let message = if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                "The selected file must be smaller than 10MB"
            } else {
                "Select a file to upload"
            };
            let mut errors = FieldErrors::new();
            errors.add(DOCUMENT_FIELD, message);
            return Ok(document_page(account_id, Some(&errors), None).into_response());
        }
    };
    let document = match validate_document(
        upload.file_name.as_deref(),
        upload.content_type.as_deref(),
        upload.bytes,
    ) {
        Ok(document) => document,
        Err(errors) => return Ok(document_page(account_id, Some(&errors), None).into_response()),
    };

    let outcome = state
        .coordinator
        .submit(
            account_id,
            TaskName::GovernmentEntityDocument,
            |provider, psp_account_id| async move {
                provider
                    .upload_entity_document(&psp_account_id, &document)
                    .await
            },
        )
        .await?;

    match outcome {
        Ok(()) => Ok(redirect_to(&onboarding_root(account_id))),
        Err(failure) => {
            let PageErrors { fields, summary } = failure.page_errors(&[DOCUMENT_FIELD]);
            Ok(document_page(account_id, Some(&fields), summary).into_response())
        }
    }
}

fn document_routes(state: &AppState) -> Router<AppState> {
    let Some(task) = state.registry.get(TaskName::GovernmentEntityDocument) else {
        return Router::new();
    };
    let router = Router::new()
        .route(&task_route(task), get(show_document).post(upload_document))
        .layer(DefaultBodyLimit::max(MAX_DOCUMENT_BYTES + 64 * 1024));
    gated(state, TaskName::GovernmentEntityDocument, router)
}

/// Build the onboarding routes.
pub fn onboarding_routes(state: AppState) -> Router {
    Router::new()
        .route("/accounts/{account_id}/onboarding", get(task_list))
        .merge(single_page::<BankAccountForm>(&state))
        .merge(responsible_person_routes(&state))
        .merge(single_page::<DirectorForm>(&state))
        .merge(single_page::<VatNumberForm>(&state))
        .merge(single_page::<CompanyNumberForm>(&state))
        .merge(single_page::<OrganisationDetailsForm>(&state))
        .merge(document_routes(&state))
        .layer(middleware::from_fn(require_session))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
