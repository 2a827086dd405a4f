use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::commands::ScanArgs;
use crate::config::{
    self, dedup_testcases, ApiGeneration, DistributionSystem, StingrayConfig, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_POLL_INTERVAL_SECS, DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY_SECS,
};
use crate::distribution::{
    AppCenterResolver, DistributionResolver, FileResolver, HockeyAppResolver, VersionSelector, DOWNLOAD_DIR,
};
use crate::errors::{RetryPolicy, StingrayError};
use crate::models::{ProfileId, TestCaseId};
use crate::pipeline::events::TracingSink;
use crate::pipeline::orchestrator::ScanOrchestrator;
use crate::pipeline::state::{ReportKind, RunConfig};
use crate::reporting::format_run_summary;
use crate::transport::{
    CurrentTransport, CurrentTransportConfig, LegacyTransport, ScanTransport, ServiceEndpoint,
};

pub const TOKEN_ENV: &str = "STINGRAY_TOKEN";

/// Everything a run needs, resolved from flags, the config file and the
/// environment.
pub struct ScanPlan {
    pub api: ApiGeneration,
    pub endpoint: ServiceEndpoint,
    pub current: Option<CurrentTransportConfig>,
    pub run: RunConfig,
    pub distribution: DistributionPlan,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DistributionPlan {
    File(PathBuf),
    HockeyApp {
        token: String,
        bundle_id: Option<String>,
        public_id: Option<String>,
        version: VersionSelector,
    },
    AppCenter {
        token: String,
        owner: String,
        app: String,
        release_id: Option<String>,
        version: VersionSelector,
    },
}

pub async fn handle_scan(args: ScanArgs, quiet: bool) -> Result<(), StingrayError> {
    let file_config = if let Some(config_path) = &args.config {
        Some(config::parse_config(&PathBuf::from(config_path)).await?)
    } else {
        None
    };

    let env_token = std::env::var(TOKEN_ENV).ok().filter(|t| !t.is_empty());
    let mut plan = build_scan_plan(&args, file_config.as_ref(), env_token)?;

    let resolver = build_resolver(&plan.distribution)?;
    info!(system = resolver.name(), "Resolving application binary");
    plan.run.binary = resolver.resolve().await?;

    let transport: Arc<dyn ScanTransport> = match plan.api {
        ApiGeneration::Legacy => Arc::new(LegacyTransport::new(&plan.endpoint)?),
        ApiGeneration::Current => {
            let current = plan
                .current
                .clone()
                .ok_or_else(|| StingrayError::Config("Current API settings missing".into()))?;
            Arc::new(CurrentTransport::new(&plan.endpoint, current)?)
        }
    };

    let cancel_token = CancellationToken::new();
    let orchestrator = ScanOrchestrator::new(plan.run, transport, Arc::new(TracingSink))
        .with_cancel_token(cancel_token.clone());

    let run = orchestrator.run();
    tokio::pin!(run);
    let result = tokio::select! {
        result = &mut run => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupt received, stopping at the next status check");
            cancel_token.cancel();
            run.await
        }
    };
    let summary = result?;

    if !quiet {
        println!("{}", format_run_summary(&summary));
    }
    Ok(())
}

fn required(value: Option<String>, what: &str) -> Result<String, StingrayError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| StingrayError::Config(format!("{} is required", what)))
}

/// Merge CLI flags over config file values. Flags win; the token falls back
/// to the environment.
pub fn build_scan_plan(
    args: &ScanArgs,
    file_config: Option<&StingrayConfig>,
    env_token: Option<String>,
) -> Result<ScanPlan, StingrayError> {
    let service = file_config.and_then(|c| c.service.clone()).unwrap_or_default();
    let scan = file_config.and_then(|c| c.scan.clone()).unwrap_or_default();
    let retry = file_config.and_then(|c| c.retry.clone()).unwrap_or_default();
    let report = file_config.and_then(|c| c.report.clone()).unwrap_or_default();
    let distribution = file_config.and_then(|c| c.distribution.clone()).unwrap_or_default();

    let api = args.api.or(service.api).unwrap_or_default();
    let url = required(args.url.clone().or(service.url), "Service URL (--url)")?;
    let token = required(
        args.token.clone().or(service.token).or(env_token),
        &format!("Service token (--token or {})", TOKEN_ENV),
    )?;

    let retry_policy = RetryPolicy::new(
        args.retry_attempts.or(retry.attempts).unwrap_or(DEFAULT_RETRY_ATTEMPTS),
        Duration::from_secs(args.retry_delay.or(retry.delay_secs).unwrap_or(DEFAULT_RETRY_DELAY_SECS)),
    );

    let current = match api {
        ApiGeneration::Legacy => None,
        ApiGeneration::Current => Some(CurrentTransportConfig {
            company_id: required(args.company_id.clone().or(service.company_id), "Company id (--company-id)")?,
            architecture_id: required(
                args.architecture_id.clone().or(service.architecture_id),
                "Architecture id (--architecture-id)",
            )?,
            architecture_type: required(
                args.architecture_type.clone().or(service.architecture_type),
                "Architecture type (--architecture-type)",
            )?
            .to_ascii_lowercase(),
        }),
    };

    let profile = args
        .profile
        .or(scan.profile)
        .ok_or_else(|| StingrayError::Config("Profile id (--profile) is required".into()))?;

    let raw_testcases = if args.testcases.is_empty() {
        scan.testcases.unwrap_or_default()
    } else {
        args.testcases.clone()
    };
    let testcases: Vec<TestCaseId> = dedup_testcases(&raw_testcases).into_iter().map(TestCaseId).collect();
    if testcases.is_empty() {
        return Err(StingrayError::Config("At least one test case (--testcase) is required".into()));
    }

    let report_kinds: Vec<ReportKind> = if args.reports.is_empty() {
        report.types.unwrap_or_else(|| vec![ReportKind::Standard])
    } else {
        args.reports.clone()
    };

    let run = RunConfig {
        binary: PathBuf::new(),
        profile: ProfileId(profile),
        testcases,
        poll_interval: Duration::from_secs(
            args.poll_interval.or(scan.poll_interval_secs).unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
        ),
        max_attempts: args.max_attempts.or(scan.max_attempts).unwrap_or(DEFAULT_MAX_ATTEMPTS).max(1),
        no_wait: args.no_wait || scan.no_wait.unwrap_or(false),
        report_kinds,
        output_dir: args
            .output_dir
            .as_ref()
            .map(PathBuf::from)
            .or(report.output_dir)
            .unwrap_or_else(|| PathBuf::from(".")),
        json_file: args.json_file.clone().or(report.json_file),
    };

    let system = args.distribution_system.unwrap_or(distribution.system);
    let distribution = match system {
        DistributionSystem::File => {
            let path = args
                .file_path
                .as_ref()
                .map(PathBuf::from)
                .or(distribution.file)
                .ok_or_else(|| StingrayError::Config("Binary path (--file-path) is required".into()))?;
            DistributionPlan::File(path)
        }
        DistributionSystem::HockeyApp => {
            let hockey = distribution.hockeyapp.unwrap_or_default();
            let bundle_id = args.hockey_bundle_id.clone().or(hockey.bundle_id);
            let public_id = args.hockey_public_id.clone().or(hockey.public_id);
            if bundle_id.is_none() && public_id.is_none() {
                return Err(StingrayError::Config(
                    "HockeyApp needs --hockey-bundle-id or --hockey-public-id".into(),
                ));
            }
            DistributionPlan::HockeyApp {
                token: required(args.hockey_token.clone().or(hockey.token), "HockeyApp token (--hockey-token)")?,
                bundle_id,
                public_id,
                version: VersionSelector::parse(args.hockey_version.as_deref().or(hockey.version.as_deref())),
            }
        }
        DistributionSystem::AppCenter => {
            let appcenter = distribution.appcenter.unwrap_or_default();
            DistributionPlan::AppCenter {
                token: required(
                    args.appcenter_token.clone().or(appcenter.token),
                    "AppCenter token (--appcenter-token)",
                )?,
                owner: required(
                    args.appcenter_owner_name.clone().or(appcenter.owner),
                    "AppCenter owner (--appcenter-owner-name)",
                )?,
                app: required(
                    args.appcenter_app_name.clone().or(appcenter.app),
                    "AppCenter app (--appcenter-app-name)",
                )?,
                release_id: args.appcenter_release_id.clone().or(appcenter.release_id),
                version: VersionSelector::parse(
                    args.appcenter_app_version.as_deref().or(appcenter.version.as_deref()),
                ),
            }
        }
    };

    Ok(ScanPlan {
        api,
        endpoint: ServiceEndpoint {
            url,
            token,
            retry: retry_policy,
        },
        current,
        run,
        distribution,
    })
}

pub fn build_resolver(plan: &DistributionPlan) -> Result<Box<dyn DistributionResolver>, StingrayError> {
    let download_dir = PathBuf::from(DOWNLOAD_DIR);
    Ok(match plan.clone() {
        DistributionPlan::File(path) => Box::new(FileResolver::new(path)),
        DistributionPlan::HockeyApp { token, bundle_id, public_id, version } => Box::new(HockeyAppResolver::new(
            token,
            bundle_id,
            public_id,
            version,
            download_dir,
        )?),
        DistributionPlan::AppCenter { token, owner, app, release_id, version } => Box::new(
            AppCenterResolver::new(token, owner, app, release_id, version, download_dir)?,
        ),
    })
}
