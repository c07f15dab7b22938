use std::sync::Arc;

use tracing::{info, info_span, warn};

use crate::broadcast::SigningPhase;
use crate::config::Config;
use crate::conversion::{
    classify, ConversionAdapter, ConversionError, Converter, DocumentFormat, HttpConverter,
};
use crate::db::document_repo::{self, DocumentRow};
use crate::db::investor_repo::{self, InvestorRow};
use crate::db::subscription_repo::{self, SubscriptionRow};
use crate::db::Database;
use crate::error::ConfigError;
use crate::esign::{HttpSignatureService, SignatureService};
use crate::model::{Countersigner, Signatory};
use crate::notify::{DbNotifier, Notifier};
use crate::sanitize::redact_key;
use crate::signing::{resolve_countersigner, resolve_signatories};
use crate::storage::{FileObjectStore, ObjectStore};

use super::config::PipelineConfig;
use super::context::{IssuedRequest, PipelineContext, SigningOutcome, SigningRequest};
use super::coordinator::RequestCoordinator;
use super::error::PipelineError;
use super::progress::{ProgressEvent, ProgressReporter};
use super::{dispatch, guard, state};

/// Records a run works on, loaded up front.
struct Loaded {
    subscription: SubscriptionRow,
    investor: InvestorRow,
    /// Head of the requested document's version chain.
    document: DocumentRow,
}

pub struct Pipeline {
    db: Database,
    store: Arc<dyn ObjectStore>,
    converter: Arc<dyn Converter>,
    esign: Arc<dyn SignatureService>,
    notifier: Arc<dyn Notifier>,
    config: Arc<PipelineConfig>,
}

impl Pipeline {
    /// Builds a pipeline from explicit collaborators.
    pub fn new(
        db: Database,
        store: Arc<dyn ObjectStore>,
        converter: Arc<dyn Converter>,
        esign: Arc<dyn SignatureService>,
        notifier: Arc<dyn Notifier>,
        config: Arc<PipelineConfig>,
    ) -> Self {
        Self {
            db,
            store,
            converter,
            esign,
            notifier,
            config,
        }
    }

    /// Production constructor: filesystem object store, HTTP conversion and
    /// e-signature clients, and in-app notifications.
    pub fn from_config(db: Database, config: &Config) -> Result<Self, ConfigError> {
        let store = FileObjectStore::from_config(&config.storage)?;
        let converter =
            HttpConverter::from_config(&config.conversion).map_err(|e| ConfigError::Validation {
                message: format!("conversion client: {}", e),
            })?;
        let esign = HttpSignatureService::from_config(&config.esign)?;
        let notifier = DbNotifier::new(db.clone());

        Ok(Self::new(
            db,
            Arc::new(store),
            Arc::new(converter),
            Arc::new(esign),
            Arc::new(notifier),
            Arc::new(PipelineConfig::from_config(config)),
        ))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Runs the signature pipeline for one document.
    pub fn run(
        &self,
        request: SigningRequest,
        progress: &dyn ProgressReporter,
    ) -> Result<SigningOutcome, PipelineError> {
        let _pipeline_span = info_span!("signature_pipeline",
            document_id = %request.document_id,
            subscription_id = %request.subscription_id,
        )
        .entered();

        let mut ctx = PipelineContext::new(request);
        match self.execute(&mut ctx, progress) {
            Ok(outcome) => {
                info!(
                    document_id = %outcome.document_id,
                    requests = outcome.signatory_requests.len() + 1,
                    warnings = outcome.warnings.len(),
                    converted = outcome.converted,
                    "Signature requests sent"
                );
                progress.report(ProgressEvent::Completed {
                    signable_document_id: outcome.document_id.clone(),
                    request_ids: outcome.request_ids(),
                });
                Ok(outcome)
            }
            Err(e) => {
                warn!(kind = %e.kind(), error = %e, "Signature pipeline failed");
                progress.report(ProgressEvent::Failed {
                    kind: e.kind(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    fn execute(
        &self,
        ctx: &mut PipelineContext,
        progress: &dyn ProgressReporter,
    ) -> Result<SigningOutcome, PipelineError> {
        // Step 1: Load subscription, investor and the current document version
        let loaded = {
            let _step = info_span!("load").entered();
            phase(progress, SigningPhase::Loading, "Loading subscription and document...");
            self.step_load(&ctx.request)?
        };

        // Step 2: Classify
        let needs_conversion = {
            let _step = info_span!("classify").entered();
            phase(progress, SigningPhase::Classifying, "Checking document format...");
            self.step_classify(&loaded.document)?
        };

        // Step 3: Resolve signatories
        let signatories = {
            let _step = info_span!("resolve_signatories").entered();
            phase(
                progress,
                SigningPhase::ResolvingSignatories,
                "Resolving signatories...",
            );
            self.step_resolve_signatories(ctx, &loaded.investor)?
        };

        // Step 4: Resolve countersigner
        let countersigner = {
            let _step = info_span!("resolve_countersigner").entered();
            phase(
                progress,
                SigningPhase::ResolvingCountersigner,
                "Resolving countersigner...",
            );
            self.step_resolve_countersigner(ctx)?
        };

        // Step 5: Convert when the current version is not a PDF yet
        let signable = if needs_conversion {
            let _step = info_span!("convert").entered();
            phase(progress, SigningPhase::Converting, "Converting document to PDF...");
            self.step_convert(ctx, &loaded.document)?
        } else {
            loaded.document.clone()
        };
        let converted = needs_conversion;

        // Step 6: Claim the signable document
        {
            let _step = info_span!("claim", document_id = %signable.id).entered();
            phase(progress, SigningPhase::Claiming, "Checking for existing requests...");
            guard::claim(
                &self.db,
                &signable.id,
                ctx.request.operator_profile_id.as_deref(),
            )?;
        }

        // Step 7: Create one request per party
        let countersigner_request = {
            let _step = info_span!("create_requests").entered();
            phase(
                progress,
                SigningPhase::CreatingRequests,
                &format!("Creating {} signature requests...", signatories.len() + 1),
            );
            match self.step_create_requests(ctx, &signable, &signatories, &countersigner) {
                Ok(request) => request,
                Err(e) => {
                    if !ctx.reached_provider() {
                        guard::release(&self.db, &signable.id);
                    }
                    return Err(e);
                }
            }
        };

        // Step 8: Update document and subscription
        {
            let _step = info_span!("update_state").entered();
            phase(progress, SigningPhase::UpdatingState, "Updating document state...");
            state::apply(
                &self.db,
                &signable.id,
                &loaded.subscription.id,
                crate::db::now(),
                &mut ctx.warnings,
            )?;
        }

        // Step 9: Notify the introducer
        {
            let _step = info_span!("notify").entered();
            phase(progress, SigningPhase::Notifying, "Notifying introducer...");
            dispatch::notify_introducer(
                &self.db,
                self.notifier.as_ref(),
                &loaded.subscription.deal_id,
                &loaded.subscription.id,
                self.config.subscription_link(&loaded.subscription.id),
                &mut ctx.warnings,
            );
        }

        let signatory_requests = ctx
            .issued
            .iter()
            .filter(|r| r.request_id != countersigner_request.request_id)
            .cloned()
            .collect();

        Ok(SigningOutcome {
            document_id: signable.id,
            source_document_id: ctx.request.document_id.clone(),
            converted,
            signatory_requests,
            countersigner_request,
            countersigner_role: countersigner.role(),
            countersigner,
            warnings: ctx.warnings.clone(),
        })
    }

    fn step_load(&self, request: &SigningRequest) -> Result<Loaded, PipelineError> {
        let document_id = request.document_id.trim();
        let subscription_id = request.subscription_id.trim();
        if document_id.is_empty() {
            return Err(PipelineError::validation("document_id is required"));
        }
        if subscription_id.is_empty() {
            return Err(PipelineError::validation("subscription_id is required"));
        }

        let subscription = subscription_repo::find_by_id(&self.db, subscription_id)?
            .ok_or_else(|| PipelineError::not_found("subscription", subscription_id))?;

        let requested = document_repo::find_by_id(&self.db, document_id)?
            .ok_or_else(|| PipelineError::not_found("document", document_id))?;
        if requested.subscription_id != subscription.id {
            return Err(PipelineError::validation(format!(
                "document '{}' does not belong to subscription '{}'",
                document_id, subscription.id
            )));
        }

        let document = if requested.is_superseded() {
            let head = document_repo::find_head(&self.db, document_id)?
                .ok_or_else(|| PipelineError::not_found("document", document_id))?;
            info!(
                requested = %requested.id,
                head = %head.id,
                "Requested document is superseded; using its latest version"
            );
            head
        } else {
            requested
        };

        let investor = investor_repo::find_investor(&self.db, &subscription.investor_id)?
            .ok_or_else(|| PipelineError::not_found("investor", &subscription.investor_id))?;

        Ok(Loaded {
            subscription,
            investor,
            document,
        })
    }

    /// Returns whether the document must be converted before signing.
    fn step_classify(&self, document: &DocumentRow) -> Result<bool, PipelineError> {
        let format = classify(document.mime_type.as_deref(), &document.file_key);
        info!(
            key = %redact_key(&document.file_key),
            mime_type = document.mime_type.as_deref().unwrap_or("none"),
            format = ?format,
            "Classified document"
        );
        match format {
            DocumentFormat::Signable => Ok(false),
            DocumentFormat::Convertible => Ok(true),
            DocumentFormat::Unsupported => Err(PipelineError::UnsupportedFormat {
                document_id: document.id.clone(),
                mime_type: document.mime_type.clone(),
            }),
        }
    }

    fn step_resolve_signatories(
        &self,
        ctx: &mut PipelineContext,
        investor: &InvestorRow,
    ) -> Result<Vec<Signatory>, PipelineError> {
        let resolved = resolve_signatories(
            &self.db,
            investor,
            ctx.request.requested_signatories(),
            self.config.max_signatories,
        )?;
        ctx.warnings.extend(resolved.warnings);
        Ok(resolved.signatories)
    }

    fn step_resolve_countersigner(
        &self,
        ctx: &mut PipelineContext,
    ) -> Result<Countersigner, PipelineError> {
        let resolved = resolve_countersigner(
            &self.db,
            ctx.request.delegate_organization_id.as_deref(),
            ctx.request.operator_profile_id.as_deref(),
        )?;
        info!(role = %resolved.countersigner.role(), "Resolved countersigner");
        ctx.warnings.extend(resolved.warnings);
        Ok(resolved.countersigner)
    }

    fn step_convert(
        &self,
        ctx: &PipelineContext,
        source: &DocumentRow,
    ) -> Result<DocumentRow, PipelineError> {
        let adapter = ConversionAdapter::new(self.store.as_ref(), self.converter.as_ref());
        adapter
            .convert(&self.db, source, ctx.request.operator_profile_id.as_deref())
            .map_err(|e| match e {
                ConversionError::AlreadyConverted(id) => PipelineError::Conflict {
                    document_id: id,
                    pending_ids: Vec::new(),
                    signed_ids: Vec::new(),
                    in_flight: true,
                },
                other => PipelineError::Conversion(other),
            })
    }

    fn step_create_requests(
        &self,
        ctx: &mut PipelineContext,
        signable: &DocumentRow,
        signatories: &[Signatory],
        countersigner: &Countersigner,
    ) -> Result<IssuedRequest, PipelineError> {
        let document_url = self
            .store
            .signed_url(&signable.file_key, self.config.signed_url_ttl)
            .map_err(|e| PipelineError::DocumentLink {
                key: redact_key(&signable.file_key),
                source: e,
            })?;

        RequestCoordinator::new(&self.db, self.esign.as_ref()).issue_all(
            ctx,
            &signable.id,
            &document_url,
            signatories,
            countersigner,
        )
    }
}

fn phase(progress: &dyn ProgressReporter, phase: SigningPhase, message: &str) {
    progress.report(ProgressEvent::Phase {
        phase,
        message: message.to_string(),
    });
}
