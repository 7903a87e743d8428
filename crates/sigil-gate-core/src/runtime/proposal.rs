// sigil-gate-core/src/runtime/proposal.rs
// ============================================================================
// Module: Sigil Gate Proposal Manager
// Description: Proposal generation, risk scoring, approval, and expiry.
// Purpose: Gate instance creation behind risk assessment and human review.
// Dependencies: crate::core, crate::interfaces, crate::runtime
// ============================================================================

//! ## Overview
//! The proposal manager synthesizes agent definitions from data-source
//! templates, scores their risk across five weighted categories, and
//! routes them to automatic, human, or elevated approval. Low-risk
//! proposals spawn immediately with a synthetic system decision; the rest
//! queue as `pending` with a linked hold and an expiry deadline.
//!
//! Proposals survive restarts: the manager rehydrates lazily from its
//! store at first use and writes through on every state change. The
//! proposal owns the hold linkage; the hold-to-proposal index is derived.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use rand::RngCore;
use rand::rngs::OsRng;
use serde_json::Value;
use thiserror::Error;

use crate::core::agent::AgentCategory;
use crate::core::agent::AgentDefinition;
use crate::core::agent::AgentInstance;
use crate::core::agent::ResourceLimits;
use crate::core::agent::RiskLevel;
use crate::core::audit::AuditEventDraft;
use crate::core::audit::AuditEventType;
use crate::core::hold::HoldSeverity;
use crate::core::identifiers::AgentId;
use crate::core::identifiers::HoldId;
use crate::core::identifiers::NamespaceId;
use crate::core::identifiers::OperatorId;
use crate::core::identifiers::ProposalId;
use crate::core::identifiers::TemplateId;
use crate::core::identifiers::ToolName;
use crate::core::identifiers::prefix;
use crate::core::proposal::AgentProposal;
use crate::core::proposal::ApprovalLevel;
use crate::core::proposal::DataAccessSummary;
use crate::core::proposal::DataSource;
use crate::core::proposal::EstimateTriplet;
use crate::core::proposal::ProposalDecision;
use crate::core::proposal::ProposalJustification;
use crate::core::proposal::ProposalState;
use crate::core::proposal::ProposalTrigger;
use crate::core::proposal::ResourceEstimate;
use crate::core::proposal::RiskAssessment;
use crate::core::time::Timestamp;
use crate::interfaces::ProposalNotifier;
use crate::interfaces::ProposalStore;
use crate::runtime::audit::AuditLog;
use crate::runtime::hold::HoldCreateRequest;
use crate::runtime::hold::HoldManager;
use crate::runtime::registry::AgentRegistry;
use crate::runtime::registry::RegistryError;
use crate::runtime::registry::SpawnRequest;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Synthetic operator identity recorded on automatic approvals.
const AUTO_OPERATOR: &str = "system.auto";

/// Risk score at or above which approval is elevated.
const ELEVATED_RISK_FLOOR: f64 = 0.7;
/// Risk score at or above which a human decision is required.
const HUMAN_RISK_FLOOR: f64 = 0.3;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Proposal manager configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProposalConfig {
    /// Time a pending proposal stays decidable before expiry.
    pub default_ttl_ms: u64,
}

impl Default for ProposalConfig {
    fn default() -> Self {
        Self {
            default_ttl_ms: 86_400_000,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Proposal manager errors.
#[derive(Debug, Error)]
pub enum ProposalError {
    /// Proposal identifier is unknown.
    #[error("unknown proposal `{0}`")]
    UnknownProposal(String),
    /// Proposal is not pending.
    #[error("proposal `{0}` is not pending")]
    NotPending(String),
    /// Registry refused the spawn.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// Manager state was unavailable.
    #[error("proposal state unavailable")]
    Unavailable,
}

// ============================================================================
// SECTION: Modifications
// ============================================================================

/// Optional definition changes applied at approval time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProposalModifications {
    /// Replacement human-readable name.
    pub name: Option<String>,
    /// Replacement purpose.
    pub purpose: Option<String>,
    /// Replacement resource ceilings.
    pub resource_limits: Option<ResourceLimits>,
    /// Replacement governing frame.
    pub frame: Option<String>,
}

// ============================================================================
// SECTION: Manager State
// ============================================================================

/// Guarded proposal manager state.
struct ProposalInner {
    /// Proposals keyed by id.
    proposals: BTreeMap<ProposalId, AgentProposal>,
    /// Derived hold to proposal index.
    hold_index: BTreeMap<HoldId, ProposalId>,
    /// Whether the store has been consulted yet.
    hydrated: bool,
    /// Monotonic id counter.
    next_seq: u64,
}

// ============================================================================
// SECTION: Proposal Manager
// ============================================================================

/// Generates, scores, queues, and decides agent proposals.
pub struct ProposalManager {
    /// Manager configuration.
    config: ProposalConfig,
    /// Registry used to register definitions and spawn instances.
    registry: Arc<AgentRegistry>,
    /// Hold manager for human-review linkage.
    holds: Arc<HoldManager>,
    /// Shared audit log.
    audit: Arc<AuditLog>,
    /// Optional persistent store.
    store: Option<Box<dyn ProposalStore + Send + Sync>>,
    /// Optional notification hook.
    notifier: Option<Box<dyn ProposalNotifier + Send + Sync>>,
    /// Guarded state.
    inner: Mutex<ProposalInner>,
    /// Boot-scoped random tag for id suffixes.
    boot_tag: u64,
}

impl ProposalManager {
    /// Creates a proposal manager.
    #[must_use]
    pub fn new(
        config: ProposalConfig,
        registry: Arc<AgentRegistry>,
        holds: Arc<HoldManager>,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self {
            config,
            registry,
            holds,
            audit,
            store: None,
            notifier: None,
            inner: Mutex::new(ProposalInner {
                proposals: BTreeMap::new(),
                hold_index: BTreeMap::new(),
                hydrated: false,
                next_seq: 1,
            }),
            boot_tag: OsRng.next_u64(),
        }
    }

    /// Attaches a persistent store.
    #[must_use]
    pub fn with_store(mut self, store: Box<dyn ProposalStore + Send + Sync>) -> Self {
        self.store = Some(store);
        self
    }

    /// Attaches a notification hook.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Box<dyn ProposalNotifier + Send + Sync>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Generates a proposal for a data source and routes it by risk.
    ///
    /// # Errors
    ///
    /// Returns [`ProposalError`] when manager state is unavailable or an
    /// automatic approval fails to spawn.
    pub fn generate_proposal(
        &self,
        trigger: ProposalTrigger,
        data_source: &DataSource,
        context: BTreeMap<String, Value>,
        now: Timestamp,
    ) -> Result<AgentProposal, ProposalError> {
        let template = template_for(&data_source.source_type);
        let definition = synthesize_definition(&template, data_source);
        let estimate = template.estimate;
        let risk = assess_risk(&template, &definition, data_source, &estimate);
        let score = risk.score();
        let approval_level = if score >= ELEVATED_RISK_FLOOR {
            ApprovalLevel::Elevated
        } else if score >= HUMAN_RISK_FLOOR || definition.requires_approval {
            ApprovalLevel::Human
        } else {
            ApprovalLevel::Auto
        };

        let proposal_id = {
            let mut inner = self.inner.lock().map_err(|_| ProposalError::Unavailable)?;
            self.hydrate(&mut inner);
            let seq = inner.next_seq;
            inner.next_seq += 1;
            ProposalId::new(format!(
                "{}{seq:06}_{:08x}",
                prefix::PROPOSAL,
                self.boot_tag & 0xFFFF_FFFF
            ))
        };

        let mut proposal = AgentProposal {
            proposal_id: proposal_id.clone(),
            definition,
            justification: ProposalJustification {
                trigger,
                summary: format!(
                    "{} for data source `{}` ({})",
                    template.summary, data_source.source_id, data_source.source_type
                ),
                context,
            },
            risk,
            estimate,
            data_access: DataAccessSummary {
                sources: vec![data_source.source_id.clone()],
                source_types: vec![data_source.source_type.clone()],
                requires_credentials: data_source.auth_scheme.is_some(),
            },
            approval_level,
            state: ProposalState::Pending,
            created_at: now,
            expires_at: Some(now.saturating_add_millis(self.config.default_ttl_ms)),
            hold_id: None,
            decision: None,
        };

        if approval_level == ApprovalLevel::Auto {
            proposal.state = ProposalState::Approved;
            proposal.expires_at = None;
            proposal.decision = Some(ProposalDecision {
                decided_by: OperatorId::new(AUTO_OPERATOR),
                decided_at: now,
                reason: format!("auto-approved at risk score {score:.2}"),
                approved: true,
            });
            self.insert(proposal.clone())?;
            self.audit.record(
                AuditEventDraft::new(AuditEventType::ProposalAutoApproved, now)
                    .proposal(proposal_id.clone())
                    .agent(proposal.definition.agent_id.clone())
                    .detail("risk_score", risk_value(score)),
            );
            self.spawn_from(&proposal, now)?;
            return Ok(proposal);
        }

        let hold = self.holds.create(
            HoldCreateRequest {
                agent_id: proposal.definition.agent_id.clone(),
                frame: proposal.definition.frame.clone(),
                tool: ToolName::new("SpawnAgent"),
                arguments: Value::Null,
                reason: format!("proposal `{proposal_id}` awaits approval"),
                severity: severity_for_risk(score),
                metadata: BTreeMap::from([(
                    "proposal_id".to_string(),
                    Value::String(proposal_id.to_string()),
                )]),
            },
            now,
        );
        proposal.hold_id = Some(hold.hold_id.clone());
        self.insert(proposal.clone())?;
        self.audit.record(
            AuditEventDraft::new(AuditEventType::ProposalCreated, now)
                .proposal(proposal_id)
                .agent(proposal.definition.agent_id.clone())
                .detail("risk_score", risk_value(score))
                .detail("hold_id", Value::String(hold.hold_id.to_string())),
        );
        if let Some(notifier) = &self.notifier {
            let _ = notifier.proposal_pending(&proposal);
        }
        Ok(proposal)
    }

    /// Approves a pending proposal and spawns its instance.
    ///
    /// # Errors
    ///
    /// Returns [`ProposalError`] when the proposal is unknown, not
    /// pending, or the spawn fails.
    pub fn approve(
        &self,
        proposal_id: &ProposalId,
        approver: &OperatorId,
        reason: &str,
        modifications: Option<ProposalModifications>,
        now: Timestamp,
    ) -> Result<AgentInstance, ProposalError> {
        let proposal = {
            let mut inner = self.inner.lock().map_err(|_| ProposalError::Unavailable)?;
            self.hydrate(&mut inner);
            let proposal = inner
                .proposals
                .get_mut(proposal_id)
                .ok_or_else(|| ProposalError::UnknownProposal(proposal_id.to_string()))?;
            if proposal.state != ProposalState::Pending {
                return Err(ProposalError::NotPending(proposal_id.to_string()));
            }
            if let Some(modifications) = modifications {
                apply_modifications(&mut proposal.definition, modifications);
            }
            proposal.state = ProposalState::Approved;
            proposal.decision = Some(ProposalDecision {
                decided_by: approver.clone(),
                decided_at: now,
                reason: reason.to_string(),
                approved: true,
            });
            proposal.clone()
        };

        if let Some(hold_id) = &proposal.hold_id {
            let _ = self.holds.approve(hold_id, approver, reason, None, None, now);
        }
        self.write_through(&proposal);
        self.audit.record(
            AuditEventDraft::new(AuditEventType::ProposalApproved, now)
                .proposal(proposal_id.clone())
                .operator(approver.clone()),
        );
        self.spawn_from(&proposal, now)
    }

    /// Rejects a pending proposal and its linked hold.
    ///
    /// # Errors
    ///
    /// Returns [`ProposalError`] when the proposal is unknown or not
    /// pending.
    pub fn reject(
        &self,
        proposal_id: &ProposalId,
        rejecter: &OperatorId,
        reason: &str,
        now: Timestamp,
    ) -> Result<AgentProposal, ProposalError> {
        let proposal = {
            let mut inner = self.inner.lock().map_err(|_| ProposalError::Unavailable)?;
            self.hydrate(&mut inner);
            let proposal = inner
                .proposals
                .get_mut(proposal_id)
                .ok_or_else(|| ProposalError::UnknownProposal(proposal_id.to_string()))?;
            if proposal.state != ProposalState::Pending {
                return Err(ProposalError::NotPending(proposal_id.to_string()));
            }
            proposal.state = ProposalState::Rejected;
            proposal.decision = Some(ProposalDecision {
                decided_by: rejecter.clone(),
                decided_at: now,
                reason: reason.to_string(),
                approved: false,
            });
            proposal.clone()
        };

        if let Some(hold_id) = &proposal.hold_id {
            let _ = self.holds.reject(hold_id, rejecter, reason, now);
        }
        self.write_through(&proposal);
        self.audit.record(
            AuditEventDraft::new(AuditEventType::ProposalRejected, now)
                .proposal(proposal_id.clone())
                .operator(rejecter.clone()),
        );
        Ok(proposal)
    }

    /// Expires pending proposals past their deadline. Idempotent.
    ///
    /// Returns the proposals expired by this sweep.
    pub fn expire_stale(&self, now: Timestamp) -> Vec<ProposalId> {
        let expired = {
            let Ok(mut inner) = self.inner.lock() else {
                return Vec::new();
            };
            self.hydrate(&mut inner);
            let due: Vec<ProposalId> = inner
                .proposals
                .values()
                .filter(|proposal| {
                    proposal.state == ProposalState::Pending
                        && proposal.expires_at.is_some_and(|deadline| deadline < now)
                })
                .map(|proposal| proposal.proposal_id.clone())
                .collect();
            let mut snapshots = Vec::new();
            for proposal_id in &due {
                if let Some(proposal) = inner.proposals.get_mut(proposal_id) {
                    proposal.state = ProposalState::Expired;
                    snapshots.push(proposal.clone());
                }
            }
            drop(inner);
            for snapshot in &snapshots {
                self.write_through(snapshot);
            }
            due
        };
        for proposal_id in &expired {
            self.audit.record(
                AuditEventDraft::new(AuditEventType::ProposalExpired, now)
                    .proposal(proposal_id.clone()),
            );
        }
        expired
    }

    /// Returns a proposal by identifier.
    #[must_use]
    pub fn get(&self, proposal_id: &ProposalId) -> Option<AgentProposal> {
        let mut inner = self.inner.lock().ok()?;
        self.hydrate(&mut inner);
        inner.proposals.get(proposal_id).cloned()
    }

    /// Lists proposals, optionally filtered by state.
    #[must_use]
    pub fn list(&self, state: Option<ProposalState>) -> Vec<AgentProposal> {
        let Ok(mut inner) = self.inner.lock() else {
            return Vec::new();
        };
        self.hydrate(&mut inner);
        inner
            .proposals
            .values()
            .filter(|proposal| state.is_none_or(|state| proposal.state == state))
            .cloned()
            .collect()
    }

    /// Returns the proposal linked to a hold, when any.
    #[must_use]
    pub fn proposal_for_hold(&self, hold_id: &HoldId) -> Option<AgentProposal> {
        let mut inner = self.inner.lock().ok()?;
        self.hydrate(&mut inner);
        let proposal_id = inner.hold_index.get(hold_id)?.clone();
        inner.proposals.get(&proposal_id).cloned()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Inserts a proposal into memory and writes through to the store.
    fn insert(&self, proposal: AgentProposal) -> Result<(), ProposalError> {
        {
            let mut inner = self.inner.lock().map_err(|_| ProposalError::Unavailable)?;
            if let Some(hold_id) = &proposal.hold_id {
                inner.hold_index.insert(hold_id.clone(), proposal.proposal_id.clone());
            }
            inner.proposals.insert(proposal.proposal_id.clone(), proposal.clone());
        }
        self.write_through(&proposal);
        Ok(())
    }

    /// Registers the definition (when new) and spawns the instance.
    fn spawn_from(
        &self,
        proposal: &AgentProposal,
        now: Timestamp,
    ) -> Result<AgentInstance, ProposalError> {
        if self.registry.definition(&proposal.definition.agent_id).is_none() {
            self.registry.register_definition(proposal.definition.clone())?;
        }
        let instance = self.registry.spawn_instance(
            &SpawnRequest {
                definition_id: proposal.definition.agent_id.clone(),
                campaign_id: None,
                parent_instance_id: None,
                frame: None,
            },
            now,
        )?;
        Ok(instance)
    }

    /// Rehydrates from the store on first use.
    fn hydrate(&self, inner: &mut ProposalInner) {
        if inner.hydrated {
            return;
        }
        inner.hydrated = true;
        let Some(store) = &self.store else {
            return;
        };
        let Ok(stored) = store.list_proposals(None) else {
            return;
        };
        for proposal in stored {
            if let Some(hold_id) = &proposal.hold_id {
                inner.hold_index.insert(hold_id.clone(), proposal.proposal_id.clone());
            }
            inner.proposals.entry(proposal.proposal_id.clone()).or_insert(proposal);
        }
    }

    /// Writes a proposal snapshot through to the store, degrading to
    /// memory-only on failure.
    fn write_through(&self, proposal: &AgentProposal) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(err) = store.save_proposal(proposal) {
            self.audit.record(
                AuditEventDraft::new(AuditEventType::StoreDegraded, proposal.created_at)
                    .proposal(proposal.proposal_id.clone())
                    .detail("error", Value::String(err.to_string())),
            );
        }
    }
}

// ============================================================================
// SECTION: Templates
// ============================================================================

/// Proposal template selected by data-source type.
struct ProposalTemplate {
    /// Template identifier.
    template_id: TemplateId,
    /// Short tag used inside generated agent ids.
    short: &'static str,
    /// Prose summary used in justifications.
    summary: &'static str,
    /// Category of the synthesized definition.
    category: AgentCategory,
    /// Required capability tags.
    required_capabilities: &'static [&'static str],
    /// Expected output symbol patterns.
    output_patterns: &'static [&'static str],
    /// Governing frame for the synthesized definition.
    frame: &'static str,
    /// Whether spawning always needs human approval.
    requires_approval: bool,
    /// Resource estimate.
    estimate: ResourceEstimate,
}

/// Selects the template for a data-source type.
fn template_for(source_type: &str) -> ProposalTemplate {
    match source_type {
        "web" => ProposalTemplate {
            template_id: TemplateId::new("tmpl.web_scraper"),
            short: "scraper",
            summary: "web scraping agent",
            category: AgentCategory::DataAcquisition,
            required_capabilities: &["web_scraping", "symbol_emit"],
            output_patterns: &["Ξ.web.*", "Ξ.extract.*"],
            frame: "⊙◈⚠⟲",
            requires_approval: true,
            estimate: ResourceEstimate {
                tokens: EstimateTriplet::new(50_000, 200_000, 600_000),
                execution_ms: EstimateTriplet::new(30_000, 120_000, 600_000),
                operations: EstimateTriplet::new(100, 2_000, 20_000),
            },
        },
        "api" => ProposalTemplate {
            template_id: TemplateId::new("tmpl.api_poller"),
            short: "poller",
            summary: "API polling agent",
            category: AgentCategory::Integration,
            required_capabilities: &["web_fetch", "symbol_emit"],
            output_patterns: &["Ξ.api.*"],
            frame: "⊘◇⏱⟲",
            requires_approval: false,
            estimate: ResourceEstimate {
                tokens: EstimateTriplet::new(10_000, 60_000, 200_000),
                execution_ms: EstimateTriplet::new(5_000, 30_000, 120_000),
                operations: EstimateTriplet::new(50, 500, 5_000),
            },
        },
        "database" => ProposalTemplate {
            template_id: TemplateId::new("tmpl.db_reader"),
            short: "reader",
            summary: "database reading agent",
            category: AgentCategory::DataProcessing,
            required_capabilities: &["data_query", "symbol_emit"],
            output_patterns: &["Ξ.query.*"],
            frame: "⊘◈⏱◎",
            requires_approval: false,
            estimate: ResourceEstimate {
                tokens: EstimateTriplet::new(5_000, 40_000, 150_000),
                execution_ms: EstimateTriplet::new(2_000, 20_000, 90_000),
                operations: EstimateTriplet::new(20, 200, 2_000),
            },
        },
        "stream" => ProposalTemplate {
            template_id: TemplateId::new("tmpl.stream_monitor"),
            short: "monitor",
            summary: "stream monitoring agent",
            category: AgentCategory::Monitoring,
            required_capabilities: &["web_fetch", "notify"],
            output_patterns: &["Ξ.stream.*", "Ξ.alert.*"],
            frame: "⊙◇⏱◎",
            requires_approval: false,
            estimate: ResourceEstimate {
                tokens: EstimateTriplet::new(20_000, 100_000, 400_000),
                execution_ms: EstimateTriplet::new(60_000, 600_000, 3_600_000),
                operations: EstimateTriplet::new(500, 5_000, 50_000),
            },
        },
        _ => ProposalTemplate {
            template_id: TemplateId::new("tmpl.file_processor"),
            short: "processor",
            summary: "file processing agent",
            category: AgentCategory::DataProcessing,
            required_capabilities: &["file_read", "symbol_emit"],
            output_patterns: &["Ξ.file.*"],
            frame: "⊘◈◎",
            requires_approval: false,
            estimate: ResourceEstimate {
                tokens: EstimateTriplet::new(5_000, 30_000, 120_000),
                execution_ms: EstimateTriplet::new(1_000, 10_000, 60_000),
                operations: EstimateTriplet::new(10, 100, 1_000),
            },
        },
    }
}

/// Synthesizes a definition from a template and data source.
fn synthesize_definition(template: &ProposalTemplate, source: &DataSource) -> AgentDefinition {
    let sanitized = sanitize_id_fragment(source.source_id.as_str());
    AgentDefinition {
        agent_id: AgentId::new(format!("{}{}.{sanitized}", prefix::AGENT_DEFINITION, template.short)),
        name: format!("{} for {}", template.summary, source.name),
        version: "1.0.0".to_string(),
        purpose: format!("{} over `{}`", template.summary, source.source_id),
        category: template.category,
        data_sources: vec![source.source_id.clone()],
        required_capabilities: template
            .required_capabilities
            .iter()
            .map(|capability| (*capability).to_string())
            .collect(),
        optional_capabilities: Vec::new(),
        output_patterns: template
            .output_patterns
            .iter()
            .map(|pattern| (*pattern).to_string())
            .collect(),
        resource_limits: ResourceLimits::default(),
        success_criteria: vec!["emits at least one output symbol".to_string()],
        dependencies: Vec::new(),
        frame: template.frame.to_string(),
        risk_level: if template.requires_approval { RiskLevel::High } else { RiskLevel::Medium },
        requires_approval: template.requires_approval,
        namespace: NamespaceId::new(sanitized),
        template: Some(template.template_id.clone()),
    }
}

/// Lowercases a source id into an identifier-safe fragment.
fn sanitize_id_fragment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for codepoint in raw.chars() {
        if codepoint.is_ascii_alphanumeric() {
            out.push(codepoint.to_ascii_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}

// ============================================================================
// SECTION: Risk Assessment
// ============================================================================

/// Computes the five-category risk assessment with documented factor
/// penalties. Each sub-score saturates at `1.0`.
fn assess_risk(
    template: &ProposalTemplate,
    definition: &AgentDefinition,
    source: &DataSource,
    estimate: &ResourceEstimate,
) -> RiskAssessment {
    let mut risk = RiskAssessment::default();

    if source.auth_scheme.as_deref() == Some("oauth2") {
        bump(&mut risk.data_access, 0.3, &mut risk.factors, "oauth2");
    }
    if source.auth_scheme.is_some() {
        bump(&mut risk.data_access, 0.2, &mut risk.factors, "credentialed_source");
    }
    if definition.category == AgentCategory::DataAcquisition {
        bump(&mut risk.data_access, 0.2, &mut risk.factors, "broad_acquisition");
    }

    match template.short {
        "scraper" => bump(&mut risk.external_calls, 0.3, &mut risk.factors, "web_scraping"),
        "poller" => bump(&mut risk.external_calls, 0.2, &mut risk.factors, "external_api"),
        "monitor" => bump(&mut risk.external_calls, 0.2, &mut risk.factors, "streaming_ingest"),
        _ => {}
    }

    bump(&mut risk.resource_usage, 0.1, &mut risk.factors, "baseline_compute");
    if estimate.tokens.max >= 500_000 {
        bump(&mut risk.resource_usage, 0.2, &mut risk.factors, "large_token_budget");
    }
    if estimate.operations.max >= 10_000 {
        bump(&mut risk.resource_usage, 0.2, &mut risk.factors, "high_operation_volume");
    }

    if definition.required_capabilities.iter().any(|capability| capability == "symbol_emit") {
        bump(&mut risk.symbol_creation, 0.3, &mut risk.factors, "symbol_emission");
    }
    if definition.output_patterns.len() > 2 {
        bump(&mut risk.symbol_creation, 0.2, &mut risk.factors, "wide_output_surface");
    }

    if definition
        .required_capabilities
        .iter()
        .any(|capability| capability == "delegation_spawn")
    {
        bump(&mut risk.privilege_level, 0.3, &mut risk.factors, "delegation_spawn");
    }
    if definition.category == AgentCategory::Integration {
        bump(&mut risk.privilege_level, 0.2, &mut risk.factors, "integration_bridge");
    }

    risk
}

/// Adds a factor penalty, saturating the sub-score at one.
fn bump(score: &mut f64, penalty: f64, factors: &mut Vec<String>, label: &str) {
    *score = (*score + penalty).min(1.0);
    factors.push(label.to_string());
}

/// Maps a risk score to a hold severity.
const fn severity_for_risk(score: f64) -> HoldSeverity {
    if score >= 0.8 {
        HoldSeverity::Critical
    } else if score >= 0.6 {
        HoldSeverity::High
    } else if score >= 0.3 {
        HoldSeverity::Medium
    } else {
        HoldSeverity::Low
    }
}

/// Serializes a risk score into a JSON number, falling back to null.
fn risk_value(score: f64) -> Value {
    serde_json::Number::from_f64(score).map_or(Value::Null, Value::Number)
}

// ============================================================================
// SECTION: Modifications
// ============================================================================

/// Applies approval-time modifications to a definition.
fn apply_modifications(definition: &mut AgentDefinition, modifications: ProposalModifications) {
    if let Some(name) = modifications.name {
        definition.name = name;
    }
    if let Some(purpose) = modifications.purpose {
        definition.purpose = purpose;
    }
    if let Some(limits) = modifications.resource_limits {
        definition.resource_limits = limits;
    }
    if let Some(frame) = modifications.frame {
        definition.frame = frame;
    }
}
