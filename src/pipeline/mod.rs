//! # Pipeline Module
//!
//! @title Source Reconstruction and Analysis Pipeline
//! @author Ramprasad
//!
//! Wires every stage together behind the single downstream entry point:
//!
//! 1. Fetch verified source from the explorer
//! 2. Parse the payload into a source map
//! 3. Rebuild the staging tree
//! 4. Resolve import remaps
//! 5. Select and activate the compiler version
//! 6. Run the analyzer on every file
//! 7. Aggregate the results
//!
//! Steps 3-6 run while holding the [`ToolchainLease`], so two runs in the
//! same process never share a staging tree or switch compilers under each
//! other.

use crate::config::SentinelConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::fetcher::{FetchedSource, HttpExplorerClient, SourceFetcher};
use crate::parser::{parse_source_payload, SourceMap};
use crate::project::{ProjectLayout, ProjectTreeBuilder, RemapResolver, RemapTable, StagedProject};
use crate::report::{AnalysisResult, ResultAggregator};
use crate::runner::{
    AnalysisProgress, AnalysisRunner, CommandRunner, FileAnalysis, NoProgress, SystemCommandRunner,
};
use crate::toolchain::{ToolchainLease, ToolchainSelector};
use log::{error, info};
use std::time::Duration;

/// Everything a completed run produced.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub address: String,

    /// Compiler version that was active during analysis.
    pub compiler_version: String,

    pub sources: SourceMap,

    pub project: StagedProject,

    pub remaps: RemapTable,

    /// Per-file analyzer results in source map order.
    pub analyses: Vec<FileAnalysis>,

    pub result: AnalysisResult,
}

/// A reconstructed project that has not been analyzed.
#[derive(Debug, Clone)]
pub struct StagedRun {
    pub source: FetchedSource,
    pub sources: SourceMap,
    pub project: StagedProject,
    pub remaps: RemapTable,
}

/// The reconstruction and analysis pipeline.
pub struct Pipeline {
    fetcher: SourceFetcher,
    builder: ProjectTreeBuilder,
    runner: Box<dyn CommandRunner>,
    analyzer: String,
    toolchain_manager: String,
}

impl Pipeline {
    /// Creates a pipeline with the default `slither` / `solc-select` binaries.
    pub fn new(
        fetcher: SourceFetcher,
        layout: ProjectLayout,
        runner: Box<dyn CommandRunner>,
    ) -> Self {
        Self {
            fetcher,
            builder: ProjectTreeBuilder::new(layout),
            runner,
            analyzer: "slither".to_string(),
            toolchain_manager: "solc-select".to_string(),
        }
    }

    /// Creates a production pipeline from configuration.
    pub fn from_config(config: &SentinelConfig) -> anyhow::Result<Self> {
        let api_key = config.require_api_key()?;
        let client = HttpExplorerClient::new(
            &config.api_url,
            api_key,
            Duration::from_secs(config.request_timeout_secs),
        )?;

        let layout =
            ProjectLayout::new(&config.staging_dir).with_dependency_root(config.dependency_root());

        Ok(Self::new(SourceFetcher::new(Box::new(client)), layout, Box::new(SystemCommandRunner))
            .with_analyzer(&config.analyzer)
            .with_toolchain_manager(&config.toolchain_manager))
    }

    pub fn with_analyzer(mut self, analyzer: impl Into<String>) -> Self {
        self.analyzer = analyzer.into();
        self
    }

    pub fn with_toolchain_manager(mut self, manager: impl Into<String>) -> Self {
        self.toolchain_manager = manager.into();
        self
    }

    /// Staging layout this pipeline writes to.
    pub fn layout(&self) -> &ProjectLayout {
        self.builder.layout()
    }

    /// Downstream entry point.
    ///
    /// Returns `None` on any fatal error after logging it. Per-file analyzer
    /// failures are not fatal.
    pub fn analyze(&self, address: &str) -> Option<AnalysisResult> {
        match self.try_analyze(address) {
            Ok(result) => Some(result),
            Err(e) => {
                error!("Analysis of {} failed [{}]: {}", address, e.kind(), e);
                None
            }
        }
    }

    /// Like [`Pipeline::analyze`], keeping the error.
    pub fn try_analyze(&self, address: &str) -> PipelineResult<AnalysisResult> {
        self.execute(address, &NoProgress).map(|run| run.result)
    }

    /// Runs every stage and returns the full run record.
    pub fn execute(
        &self,
        address: &str,
        progress: &dyn AnalysisProgress,
    ) -> PipelineResult<PipelineRun> {
        let (source, sources) = self.fetch_and_parse(address)?;

        let mut lease = ToolchainLease::acquire();

        let (project, remaps) = self.stage_sources(&sources)?;

        let selector = ToolchainSelector::new(self.runner.as_ref(), &self.toolchain_manager);
        let compiler_version = selector.select(&mut lease, &sources, &source.compiler_version)?;

        let analyzer = AnalysisRunner::new(self.runner.as_ref(), &self.analyzer);
        let analyses = analyzer.run(&sources, &project, &remaps, progress);

        drop(lease);

        let result = ResultAggregator::aggregate(&sources, &analyses);
        let failed = analyses.iter().filter(|a| a.output().is_none()).count();
        info!(
            "Analysis of {} complete: {} file(s), {} failed",
            address,
            analyses.len(),
            failed
        );

        Ok(PipelineRun {
            address: address.to_string(),
            compiler_version,
            sources,
            project,
            remaps,
            analyses,
            result,
        })
    }

    /// Fetches, parses and stages a contract without touching the toolchain
    /// or running the analyzer.
    pub fn stage(&self, address: &str) -> PipelineResult<StagedRun> {
        let (source, sources) = self.fetch_and_parse(address)?;

        let _lease = ToolchainLease::acquire();
        let (project, remaps) = self.stage_sources(&sources)?;

        Ok(StagedRun {
            source,
            sources,
            project,
            remaps,
        })
    }

    fn fetch_and_parse(&self, address: &str) -> PipelineResult<(FetchedSource, SourceMap)> {
        let address = address.trim();
        if address.is_empty() {
            return Err(PipelineError::SourceUnavailable {
                address: String::new(),
                reason: "empty contract address".to_string(),
            });
        }

        let source = self.fetcher.fetch(address)?;
        let sources = parse_source_payload(&source.source_code, &source.contract_name)?;
        Ok((source, sources))
    }

    fn stage_sources(&self, sources: &SourceMap) -> PipelineResult<(StagedProject, RemapTable)> {
        let project = self.builder.build(sources)?;
        let remaps = RemapResolver::resolve(&project, sources.remappings());
        Ok((project, remaps))
    }
}
