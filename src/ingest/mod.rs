//! Ingest pipeline
//!
//! Turns one page's fact bundle into rows of the census graph. Every entity and
//! relation goes through the resolver, so ingesting the same bundle twice
//! leaves the store unchanged.

mod facts;

pub use facts::{
    AdTrackingFacts, EmbeddedModules, ExtractedFacts, HyperlinkFact, ModuleFile, PageFacts,
    Rejection, SiteBundle, Technology, UseCase,
};

use crate::storage::{
    is_visited_in, mark_hyperlinks_visited, AdTrackingRecord, Database, FrameworkRecord,
    HyperlinkRecord, LanguageRecord, LibraryRecord, ModuleFileRecord, ModuleFunctionRecord,
    ModuleUsageRecord, Relation, RelationRecord, Session, SiteRecord, StorageResult,
};
use chrono::Utc;

/// What happened to a bundle handed to [`IngestPipeline::ingest`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The bundle was written; `site_id` identifies its Site row
    Ingested { site_id: i64 },

    /// The bundle was incomplete and nothing was written
    Rejected(Rejection),

    /// Writing stopped partway; rows written before the failure remain
    Failed(String),
}

/// Writes fact bundles into the store
#[derive(Clone)]
pub struct IngestPipeline {
    db: Database,
}

impl IngestPipeline {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Validates and persists one page's facts
    ///
    /// Errors never escape: a rejected bundle writes nothing, and a storage
    /// failure is logged and reported as [`IngestOutcome::Failed`] without
    /// undoing earlier writes.
    pub async fn ingest(&self, facts: PageFacts) -> IngestOutcome {
        let bundle = match facts.validate() {
            Ok(bundle) => bundle,
            Err(rejection) => {
                tracing::warn!("Rejected fact bundle: {}", rejection);
                return IngestOutcome::Rejected(rejection);
            }
        };

        let session = match self.db.session().await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!("Failed to ingest {}: {}", bundle.url, e);
                return IngestOutcome::Failed(e.to_string());
            }
        };

        match write_bundle(&session, &bundle) {
            Ok(site_id) => {
                tracing::debug!("Ingested {} as site {}", bundle.url, site_id);
                IngestOutcome::Ingested { site_id }
            }
            Err(e) => {
                tracing::error!("Failed to ingest {}: {}", bundle.url, e);
                IngestOutcome::Failed(e.to_string())
            }
        }
    }
}

fn write_bundle(session: &Session, bundle: &SiteBundle) -> StorageResult<i64> {
    let conn = session.conn();

    let mut hyperlink_ids = Vec::with_capacity(bundle.hyperlinks.len());
    for link in &bundle.hyperlinks {
        let already_visited = is_visited_in(conn, &link.url)?;
        let resolved = session.resolve(&HyperlinkRecord {
            url: &link.url,
            inner_text: &link.inner_text,
            already_visited,
        })?;
        if already_visited && !resolved.created {
            mark_hyperlinks_visited(conn, &link.url)?;
        }
        hyperlink_ids.push(resolved.id);
    }

    let mut language_ids = Vec::with_capacity(bundle.languages.len());
    for name in &bundle.languages {
        language_ids.push(session.resolve(&LanguageRecord { name })?.id);
    }

    let mut library_ids = Vec::with_capacity(bundle.libraries.len());
    for library in &bundle.libraries {
        library_ids.push(session.resolve(&LibraryRecord(library))?.id);
    }

    let mut framework_ids = Vec::with_capacity(bundle.frameworks.len());
    for framework in &bundle.frameworks {
        framework_ids.push(session.resolve(&FrameworkRecord(framework))?.id);
    }

    let mut module_file_ids = Vec::with_capacity(bundle.embedded_modules.files.len());
    for file in &bundle.embedded_modules.files {
        let file_id = session.resolve(&ModuleFileRecord(file))?.id;
        for symbol in &file.functions {
            let function_id = session.resolve(&ModuleFunctionRecord { symbol })?.id;
            session.resolve(&RelationRecord {
                relation: Relation::HasModuleFunction,
                left: function_id,
                right: file_id,
            })?;
        }
        module_file_ids.push(file_id);
    }

    let visited = Utc::now().format("%Y-%m-%d").to_string();
    let site = session.resolve(&SiteRecord {
        name: &bundle.name,
        url: &bundle.url,
        root: &bundle.root,
        visited: &visited,
    })?;
    if site.created {
        tracing::info!("New site {} ({})", bundle.url, bundle.name);
    }
    // Earlier pages may have linked here before this visit
    mark_hyperlinks_visited(conn, &bundle.url)?;

    session.resolve(&AdTrackingRecord {
        facts: &bundle.ad_tracking,
        site_id: site.id,
    })?;

    for file_id in module_file_ids {
        session.resolve(&ModuleUsageRecord {
            file_id,
            site_id: site.id,
            used: bundle.embedded_modules.used,
            use_case: bundle.embedded_modules.use_case,
        })?;
    }

    let relations = [
        (Relation::HasHyperlink, hyperlink_ids),
        (Relation::ContainsLibrary, library_ids),
        (Relation::ImplementsLanguage, language_ids),
        (Relation::ContainsFramework, framework_ids),
    ];
    for (relation, ids) in relations {
        for right in ids {
            session.resolve(&RelationRecord {
                relation,
                left: site.id,
                right,
            })?;
        }
    }

    Ok(site.id)
}
