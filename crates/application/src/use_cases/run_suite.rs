//! Run suite use case
//!
//! Sends every case of a suite to the server under test and judges the
//! responses. Chains run concurrently, bounded by the configured limit; the
//! steps of a chain run one after another. Every case resolves to a pass or
//! a classified failure, and one failing case never aborts the run.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::{Duration, Instant};

use conformance_domain::{CheckOutput, TestCase};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::RunConfig;
use crate::error::{ApplicationError, ApplicationResult};
use crate::outcome::{CaseOutcome, FailureKind, SuiteReport};
use crate::ports::{HttpClient, HttpClientError};
use crate::session::SessionContext;
use crate::suite::{Chain, Step, Suite};

/// Use case for running a suite.
///
/// # Example
///
/// ```ignore
/// let client = Arc::new(ReqwestHttpClient::from_config(&config)?);
/// let report = RunSuite::new(client, config).execute(suite).await?;
/// assert!(report.all_passed());
/// ```
pub struct RunSuite<C: HttpClient> {
    client: Arc<C>,
    config: RunConfig,
    session: Arc<SessionContext>,
}

impl<C: HttpClient + 'static> RunSuite<C> {
    /// Creates the use case with a fresh session.
    #[must_use]
    pub fn new(client: Arc<C>, config: RunConfig) -> Self {
        Self {
            client,
            config,
            session: Arc::new(SessionContext::new()),
        }
    }

    /// Shares an existing session, e.g. across several suites.
    #[must_use]
    pub fn with_session(mut self, session: Arc<SessionContext>) -> Self {
        self.session = session;
        self
    }

    /// The session captures are written to.
    #[must_use]
    pub const fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    /// Runs the suite.
    ///
    /// # Errors
    ///
    /// Returns an error only if the configuration or the suite itself is
    /// invalid. Failing cases are reported in the [`SuiteReport`].
    pub async fn execute(&self, suite: Suite) -> ApplicationResult<SuiteReport> {
        self.config.validate()?;
        suite.validate()?;

        let started = Instant::now();
        info!(
            cases = suite.len(),
            gateway = %self.config.gateway_url,
            "running suite"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let config = Arc::new(self.config.clone());
        let mut tasks = JoinSet::new();
        let mut step_names: Vec<Vec<String>> = Vec::new();

        for (index, chain) in suite.into_chains().into_iter().enumerate() {
            step_names.push(chain.steps().iter().map(|s| s.name().to_string()).collect());
            let runner = ChainRunner {
                client: Arc::clone(&self.client),
                session: Arc::clone(&self.session),
                config: Arc::clone(&config),
                timeout: Duration::from_millis(self.config.timeout_ms),
            };
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                (index, runner.run(chain).await)
            });
        }

        let mut chains: Vec<Option<Vec<CaseOutcome>>> = vec![None; step_names.len()];
        let mut task_errors = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcomes)) => chains[index] = Some(outcomes),
                Err(e) => {
                    error!(error = %e, "chain task failed");
                    task_errors.push(e.to_string());
                }
            }
        }

        // A chain whose task died is reported step by step, never dropped.
        let outcomes: Vec<CaseOutcome> = chains
            .into_iter()
            .zip(step_names)
            .flat_map(|(finished, names)| {
                finished.unwrap_or_else(|| {
                    let reason = format!("chain task failed: {}", task_errors.join("; "));
                    names
                        .into_iter()
                        .map(|name| CaseOutcome::failed(name, FailureKind::Construction, &reason, 0))
                        .collect()
                })
            })
            .collect();
        let report = SuiteReport::new(outcomes, elapsed_ms(started));
        info!(
            total = report.total,
            passed = report.passed,
            failed = report.failed,
            duration_ms = report.duration_ms,
            "suite finished"
        );
        Ok(report)
    }
}

struct ChainRunner<C: HttpClient> {
    client: Arc<C>,
    session: Arc<SessionContext>,
    config: Arc<RunConfig>,
    timeout: Duration,
}

impl<C: HttpClient> ChainRunner<C> {
    async fn run(&self, chain: Chain) -> Vec<CaseOutcome> {
        let mut outcomes = Vec::new();
        let mut failed_step: Option<String> = None;

        for step in chain.into_steps() {
            if let Some(prerequisite) = &failed_step {
                debug!(case = step.name(), prerequisite = %prerequisite, "skipping step");
                outcomes.push(CaseOutcome::skipped(step.name(), prerequisite));
                continue;
            }

            let outcome = self.run_step(step).await;
            if !outcome.passed {
                failed_step = Some(outcome.name.clone());
            }
            outcomes.push(outcome);
        }

        outcomes
    }

    async fn run_step(&self, step: Step) -> CaseOutcome {
        let case = match step {
            Step::Ready(case) => case,
            Step::Deferred { name, build } => {
                let session: &SessionContext = &self.session;
                match catch_unwind(AssertUnwindSafe(move || build(session))) {
                    Ok(Ok(case)) => case,
                    Ok(Err(e)) => {
                        warn!(case = %name, error = %e, "could not build case");
                        return CaseOutcome::failed(name, FailureKind::Construction, e.to_string(), 0);
                    }
                    Err(payload) => return panicked(&name, payload.as_ref(), 0),
                }
            }
        };
        self.run_case(&case).await
    }

    async fn run_case(&self, case: &TestCase) -> CaseOutcome {
        let started = Instant::now();

        let request = match self
            .config
            .base_url_for(&case.request)
            .and_then(|base| case.request.resolve(base).map_err(ApplicationError::from))
        {
            Ok(request) => request,
            Err(e) => {
                warn!(case = %case.name, error = %e, "could not resolve request");
                return CaseOutcome::failed(&case.name, FailureKind::Construction, e.to_string(), 0);
            }
        };

        debug!(case = %case.name, method = %request.method, url = %request.url, "sending request");
        let response = match tokio::time::timeout(self.timeout, self.client.execute(&request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return transport_failure(case, &e, started),
            Err(_) => {
                let e = HttpClientError::Timeout {
                    timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                };
                return transport_failure(case, &e, started);
            }
        };

        let evaluated = catch_unwind(AssertUnwindSafe(|| case.evaluate(&response)));
        let duration_ms = elapsed_ms(started);
        let output = match evaluated {
            Ok(output) => output,
            Err(payload) => return panicked(&case.name, payload.as_ref(), duration_ms),
        };
        if !output.success {
            info!(case = %case.name, status = response.status, duration_ms, "case failed");
            return CaseOutcome::failed(
                &case.name,
                FailureKind::Mismatch,
                output.diagnostic(),
                duration_ms,
            );
        }

        if let Err(e) = self.store_captures(&output) {
            warn!(case = %case.name, error = %e, "could not store capture");
            return CaseOutcome::failed(&case.name, FailureKind::Construction, e.to_string(), duration_ms);
        }

        info!(case = %case.name, status = response.status, duration_ms, "case passed");
        CaseOutcome::passed(&case.name, duration_ms)
    }

    /// Writes each captured slot once; repeats of a slot within one case are ignored.
    fn store_captures(&self, output: &CheckOutput) -> ApplicationResult<()> {
        let mut written: Vec<&str> = Vec::new();
        for capture in &output.captures {
            if written.contains(&capture.slot.as_str()) {
                continue;
            }
            self.session.write(&capture.slot, capture.value.as_str())?;
            written.push(&capture.slot);
        }
        Ok(())
    }
}

fn transport_failure(case: &TestCase, error: &HttpClientError, started: Instant) -> CaseOutcome {
    warn!(case = %case.name, error = %error, "transport error");
    CaseOutcome::failed(
        &case.name,
        FailureKind::Transport,
        error.to_string(),
        elapsed_ms(started),
    )
}

/// A case whose own code panicked fails alone; its siblings keep running.
fn panicked(name: &str, payload: &(dyn Any + Send), duration_ms: u64) -> CaseOutcome {
    let message = payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    error!(case = %name, panic = %message, "case panicked");
    CaseOutcome::failed(
        name,
        FailureKind::Construction,
        format!("case panicked: {message}"),
        duration_ms,
    )
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use conformance_domain::{
        ByteRanges, RequestSpec, ResolvedRequest, Response, expect, header,
        range::base_with_range_transform,
    };
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use url::Url;

    /// Mock HTTP client for testing.
    ///
    /// Answers by path, records every request, and optionally stalls.
    struct MockHttpClient {
        routes: Vec<(String, Result<Response, HttpClientError>)>,
        seen: Mutex<Vec<ResolvedRequest>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        delay: Duration,
    }

    impl MockHttpClient {
        fn new() -> Self {
            Self {
                routes: Vec::new(),
                seen: Mutex::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                delay: Duration::ZERO,
            }
        }

        fn route(mut self, path: &str, response: Result<Response, HttpClientError>) -> Self {
            self.routes.push((path.to_string(), response));
            self
        }

        const fn delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn requests(&self) -> Vec<ResolvedRequest> {
            self.seen.lock().clone()
        }
    }

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn execute(&self, request: &ResolvedRequest) -> Result<Response, HttpClientError> {
            self.seen.lock().push(request.clone());
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            self.routes
                .iter()
                .find(|(path, _)| *path == request.url.path())
                .map_or_else(|| Ok(Response::new(404)), |(_, response)| response.clone())
        }
    }

    fn config() -> RunConfig {
        RunConfig::from_gateway("http://gateway.test").unwrap()
    }

    fn ok(body: &str) -> Result<Response, HttpClientError> {
        Ok(Response::new(200)
            .with_header("Etag", "\"v1\"")
            .with_body(body.as_bytes().to_vec()))
    }

    #[tokio::test]
    async fn test_passing_and_mismatching_cases() {
        let client = Arc::new(MockHttpClient::new().route("/a", ok("hello")));
        let suite = Suite::new()
            .case(
                TestCase::new("a is served")
                    .request(RequestSpec::get("/a"))
                    .response(expect().status(200).body("hello")),
            )
            .case(
                TestCase::new("b is served")
                    .hint("b should exist")
                    .request(RequestSpec::get("/b"))
                    .response(expect().status(200)),
            );

        let report = RunSuite::new(client, config()).execute(suite).await.unwrap();
        assert_eq!((report.total, report.passed, report.failed), (2, 1, 1));

        let failed = report.outcome("b is served").unwrap();
        assert_eq!(failed.failure, Some(FailureKind::Mismatch));
        assert_eq!(
            failed.diagnostic.as_deref(),
            Some("status code mismatch: expected 200 got 404\n  hint: b should exist")
        );
    }

    #[tokio::test]
    async fn test_transport_error_fails_only_that_case() {
        let client = Arc::new(
            MockHttpClient::new()
                .route("/down", Err(HttpClientError::ConnectionFailed("refused".to_string())))
                .route("/up", ok("x")),
        );
        let suite = Suite::new()
            .case(TestCase::new("down").request(RequestSpec::get("/down")))
            .case(TestCase::new("up").request(RequestSpec::get("/up")));

        let report = RunSuite::new(client, config()).execute(suite).await.unwrap();
        assert_eq!(report.outcome("down").unwrap().failure, Some(FailureKind::Transport));
        assert!(report.outcome("up").unwrap().passed);
    }

    #[tokio::test]
    async fn test_timeout_is_a_transport_failure() {
        let client = Arc::new(
            MockHttpClient::new()
                .route("/slow", ok("x"))
                .delay(Duration::from_secs(5)),
        );
        let suite = Suite::new().case(TestCase::new("slow").request(RequestSpec::get("/slow")));

        let report = RunSuite::new(client, config().with_timeout_ms(50))
            .execute(suite)
            .await
            .unwrap();
        let outcome = report.outcome("slow").unwrap();
        assert_eq!(outcome.failure, Some(FailureKind::Transport));
        assert_eq!(outcome.diagnostic.as_deref(), Some("request timed out after 50 ms"));
    }

    #[tokio::test]
    async fn test_construction_error_never_reaches_the_network() {
        let client = Arc::new(MockHttpClient::new());
        let suite = Suite::new().case(
            TestCase::new("bad url").request(RequestSpec::get("/").url("::not a url::")),
        );

        let report = RunSuite::new(Arc::clone(&client), config())
            .execute(suite)
            .await
            .unwrap();
        assert_eq!(
            report.outcome("bad url").unwrap().failure,
            Some(FailureKind::Construction)
        );
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn test_chain_passes_captures_forward() {
        let client = Arc::new(
            MockHttpClient::new()
                .route("/first", ok("x"))
                .route("/second", ok("y")),
        );
        let chain = Chain::new()
            .then(
                TestCase::new("capture etag")
                    .request(RequestSpec::get("/first"))
                    .response(expect().status(200).header(header("Etag").captures("etag"))),
            )
            .then_build("conditional request", |session| {
                let etag = session.read("etag")?;
                Ok(TestCase::new("conditional request")
                    .request(RequestSpec::get("/second").header("If-None-Match", etag)))
            });

        let runner = RunSuite::new(Arc::clone(&client), config());
        let report = runner.execute(Suite::new().chain(chain)).await.unwrap();

        assert!(report.all_passed(), "{report:?}");
        assert_eq!(runner.session().read("etag").unwrap(), "\"v1\"");
        let requests = client.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests[1]
                .headers
                .iter()
                .find(|(n, _)| n == "If-None-Match")
                .map(|(_, v)| v.as_str()),
            Some("\"v1\"")
        );
    }

    #[tokio::test]
    async fn test_failed_step_skips_rest_of_chain() {
        let client = Arc::new(MockHttpClient::new().route("/ok", ok("x")));
        let chain = Chain::new()
            .then(
                TestCase::new("capture from missing")
                    .request(RequestSpec::get("/missing"))
                    .response(expect().status(200).header(header("Etag").captures("etag"))),
            )
            .then(TestCase::new("dependent").request(RequestSpec::get("/ok")));
        let independent = TestCase::new("independent").request(RequestSpec::get("/ok"));

        let runner = RunSuite::new(Arc::clone(&client), config());
        let report = runner
            .execute(Suite::new().chain(chain).case(independent))
            .await
            .unwrap();

        assert_eq!(
            report.outcome("dependent").unwrap().failure,
            Some(FailureKind::Skipped)
        );
        assert!(report.outcome("independent").unwrap().passed);
        assert!(!runner.session().contains("etag"));
        assert_eq!(client.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_deferred_build_error_is_construction_failure() {
        let client = Arc::new(MockHttpClient::new());
        let chain = Chain::new().then_build("needs etag", |session| {
            let etag = session.read("etag")?;
            Ok(TestCase::new("needs etag").request(RequestSpec::get("/").header("If-Match", etag)))
        });

        let report = RunSuite::new(client, config())
            .execute(Suite::new().chain(chain))
            .await
            .unwrap();
        let outcome = report.outcome("needs etag").unwrap();
        assert_eq!(outcome.failure, Some(FailureKind::Construction));
        assert!(outcome.diagnostic.as_deref().unwrap().contains("has not been written"));
    }

    #[tokio::test]
    async fn test_duplicate_capture_slots_rejected_before_running() {
        let client = Arc::new(MockHttpClient::new());
        let capturing = |name: &str| {
            TestCase::new(name).response(expect().header(header("Etag").captures("etag")))
        };
        let suite = Suite::new().case(capturing("one")).case(capturing("two"));

        let err = RunSuite::new(Arc::clone(&client), config())
            .execute(suite)
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::Suite(_)));
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let client = Arc::new(
            MockHttpClient::new()
                .route("/x", ok("x"))
                .delay(Duration::from_millis(20)),
        );
        let suite = Suite::new().cases(
            (0..12).map(|i| TestCase::new(format!("case {i}")).request(RequestSpec::get("/x"))),
        );

        let report = RunSuite::new(Arc::clone(&client), config().with_max_concurrency(3))
            .execute(suite)
            .await
            .unwrap();
        assert_eq!(report.passed, 12);
        assert!(client.max_in_flight.load(Ordering::SeqCst) <= 3);
        let names: Vec<&str> = report.outcomes.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names[0], "case 0");
        assert_eq!(names[11], "case 11");
    }

    #[tokio::test]
    async fn test_range_cases_against_a_full_body_server() {
        let fixture: Vec<u8> = (0..64u8).collect();
        let client = Arc::new(MockHttpClient::new().route(
            "/ipfs/bafkqabc",
            Ok(Response::new(200).with_body(fixture.clone())),
        ));
        let base = TestCase::new("raw block").request(RequestSpec::get("/ipfs/bafkqabc"));
        let ranges: ByteRanges = "0-9,20-29".parse().unwrap();
        let cases = base_with_range_transform(&base, &ranges, &fixture).unwrap();

        let report = RunSuite::new(Arc::clone(&client), config())
            .execute(Suite::new().cases(cases))
            .await
            .unwrap();
        assert!(report.all_passed(), "{report:?}");

        let mut range_headers: Vec<Option<String>> = client
            .requests()
            .iter()
            .map(|r| {
                r.headers
                    .iter()
                    .find(|(n, _)| n == "Range")
                    .map(|(_, v)| v.clone())
            })
            .collect();
        range_headers.sort();
        assert_eq!(
            range_headers,
            vec![
                None,
                Some("bytes=0-9".to_string()),
                Some("bytes=0-9,20-29".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_panicking_check_fails_only_its_case() {
        let client = Arc::new(
            MockHttpClient::new()
                .route("/x", Ok(Response::new(200).with_header("X", "abc")))
                .route("/fine", ok("fine")),
        );
        let suite = Suite::new()
            .case(
                TestCase::new("numeric header").request(RequestSpec::get("/x")).response(
                    expect().header(
                        header("X").checks("positive number", |v| v.parse::<u32>().unwrap() > 0),
                    ),
                ),
            )
            .case(TestCase::new("fine").request(RequestSpec::get("/fine")));

        let report = RunSuite::new(client, config()).execute(suite).await.unwrap();
        assert_eq!((report.total, report.passed, report.failed), (2, 1, 1));
        assert!(report.outcome("fine").unwrap().passed);

        let failed = report.outcome("numeric header").unwrap();
        assert_eq!(failed.failure, Some(FailureKind::Construction));
        assert!(failed.diagnostic.as_deref().unwrap().starts_with("case panicked: "));
    }

    #[tokio::test]
    async fn test_panicking_builder_skips_rest_of_chain() {
        let client = Arc::new(MockHttpClient::new().route("/a", ok("a")));
        let chain = Chain::new()
            .then_build("broken builder", |_| -> ApplicationResult<TestCase> {
                panic!("builder exploded")
            })
            .then(TestCase::new("after").request(RequestSpec::get("/a")));
        let suite = Suite::new()
            .chain(chain)
            .case(TestCase::new("sibling").request(RequestSpec::get("/a")));

        let report = RunSuite::new(client, config()).execute(suite).await.unwrap();
        assert_eq!(
            report.outcome("broken builder").unwrap().diagnostic.as_deref(),
            Some("case panicked: builder exploded")
        );
        assert_eq!(
            report.outcome("after").unwrap().failure,
            Some(FailureKind::Skipped)
        );
        assert!(report.outcome("sibling").unwrap().passed);
    }

    #[tokio::test]
    async fn test_subdomain_requests_use_subdomain_gateway() {
        let client = Arc::new(MockHttpClient::new().route("/file.txt", ok("x")));
        let suite = Suite::new()
            .case(
                TestCase::new("subdomain")
                    .request(RequestSpec::get("/file.txt").subdomain("bafy.ipfs")),
            )
            .case(TestCase::new("path").request(RequestSpec::get("/file.txt")));
        let config = config().with_subdomain_url(Url::parse("http://example.localhost:8080").unwrap());

        let report = RunSuite::new(Arc::clone(&client), config)
            .execute(suite)
            .await
            .unwrap();
        assert!(report.all_passed(), "{report:?}");

        let mut urls: Vec<String> = client.requests().iter().map(|r| r.url.to_string()).collect();
        urls.sort();
        assert_eq!(
            urls,
            vec![
                "http://bafy.ipfs.example.localhost:8080/file.txt".to_string(),
                "http://gateway.test/file.txt".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_subdomain_request_without_subdomain_gateway() {
        let client = Arc::new(MockHttpClient::new());
        let suite = Suite::new().case(
            TestCase::new("subdomain").request(RequestSpec::get("/").subdomain("bafy.ipfs")),
        );

        let report = RunSuite::new(Arc::clone(&client), config())
            .execute(suite)
            .await
            .unwrap();
        let outcome = report.outcome("subdomain").unwrap();
        assert_eq!(outcome.failure, Some(FailureKind::Construction));
        assert!(client.requests().is_empty());
    }
}
