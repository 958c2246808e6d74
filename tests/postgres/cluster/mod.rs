//! `PostgreSQL` server provisioning for integration tests.
//!
//! Setting `CORVEE_TEST_DATABASE_URL` points every test at an existing
//! server. Otherwise an embedded cluster is bootstrapped once per test binary
//! and shared; isolation comes from each test owning a private table.


use self::env_utils::{EnvVarGuard, env_vars_to_os, worker_env_changes};
use self::fs_utils::{sync_password_from_file, sync_port_from_pid};
use pg_embedded_setup_unpriv::worker_process_test_api::{
    WorkerOperation, WorkerRequest, WorkerRequestArgs, run as run_worker,
};
use pg_embedded_setup_unpriv::{ExecutionPrivileges, TestBootstrapSettings, bootstrap_for_tests};
use postgresql_embedded::{PostgreSQL, Status};
use rstest::fixture;
use std::sync::OnceLock;
use std::time::Duration;

/// Boxed error type for test results.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Environment variable naming an existing test database.
pub const DATABASE_URL_ENV: &str = "CORVEE_TEST_DATABASE_URL";

static SHARED_SERVER: OnceLock<TestServer> = OnceLock::new();

/// Shared server handle for integration tests.
pub type PostgresCluster = &'static TestServer;

/// Where the integration tests find `PostgreSQL`.
pub enum TestServer {
    /// A server named by [`DATABASE_URL_ENV`].
    External(String),
    /// A cluster bootstrapped for this test binary.
    Embedded(ManagedCluster),
}

impl TestServer {
    /// Connection URL for the database the tests create their tables in.
    #[must_use]
    pub fn database_url(&self) -> String {
        match self {
            Self::External(url) => url.clone(),
            Self::Embedded(cluster) => cluster.database_url("postgres"),
        }
    }
}

/// Embedded `PostgreSQL` cluster kept running for the test binary.
pub struct ManagedCluster {
    bootstrap: TestBootstrapSettings,
    env_vars: Vec<(String, Option<String>)>,
    _postgres: Option<PostgreSQL>,
}

impl ManagedCluster {
    fn new() -> Result<Self, BoxError> {
        let worker_env = worker_env_changes()?;
        let worker_guard = EnvVarGuard::set_many(&worker_env);
        let mut bootstrap = bootstrap_for_tests().map_err(|err| Box::new(err) as BoxError)?;
        drop(worker_guard);
        sync_password_from_file(&mut bootstrap.settings)?;
        let env_vars = bootstrap.environment.to_env();
        let mut cluster = Self {
            bootstrap,
            env_vars,
            _postgres: None,
        };
        match cluster.bootstrap.privileges {
            ExecutionPrivileges::Root => cluster.start_via_worker()?,
            ExecutionPrivileges::Unprivileged => cluster.start_in_process()?,
        }
        Ok(cluster)
    }

    fn database_url(&self, database: &str) -> String {
        self.bootstrap.settings.url(database)
    }

    fn start_in_process(&mut self) -> Result<(), BoxError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| Box::new(err) as BoxError)?;
        let env_guard = EnvVarGuard::set_many(&env_vars_to_os(&self.env_vars));
        let mut postgres = PostgreSQL::new(self.bootstrap.settings.clone());
        runtime.block_on(async {
            postgres
                .setup()
                .await
                .map_err(|err| Box::new(err) as BoxError)?;
            if !matches!(postgres.status(), Status::Started) {
                postgres
                    .start()
                    .await
                    .map_err(|err| Box::new(err) as BoxError)?;
            }
            Ok::<(), BoxError>(())
        })?;
        drop(env_guard);
        self.bootstrap.settings = postgres.settings().clone();
        sync_port_from_pid(&mut self.bootstrap.settings)?;
        self._postgres = Some(postgres);
        Ok(())
    }

    fn start_via_worker(&mut self) -> Result<(), BoxError> {
        self.run_worker_operation(WorkerOperation::Setup, self.bootstrap.setup_timeout)?;
        self.run_worker_operation(WorkerOperation::Start, self.bootstrap.start_timeout)?;
        sync_port_from_pid(&mut self.bootstrap.settings)
    }

    fn run_worker_operation(
        &self,
        operation: WorkerOperation,
        timeout: Duration,
    ) -> Result<(), BoxError> {
        let worker = self.bootstrap.worker_binary.as_ref().ok_or_else(|| {
            Box::new(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "PG_EMBEDDED_WORKER is not set for worker operation",
            )) as BoxError
        })?;
        let args = WorkerRequestArgs {
            worker: worker.as_path(),
            settings: &self.bootstrap.settings,
            env_vars: &self.env_vars,
            operation,
            timeout,
        };
        run_worker(&WorkerRequest::new(args)).map_err(|err| Box::new(err) as BoxError)?;
        Ok(())
    }
}

/// Provides the shared `PostgreSQL` server, starting it on first use.
///
/// # Panics
///
/// Panics when [`DATABASE_URL_ENV`] is unset and the embedded cluster cannot
/// be started, so a missing database fails the run instead of passing it.
#[fixture]
pub fn postgres_cluster() -> PostgresCluster {
    SHARED_SERVER.get_or_init(|| {
        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            return TestServer::External(url);
        }
        // Bootstrapping blocks on its own runtime, so it must not run on a
        // test runtime thread.
        let started = std::thread::spawn(ManagedCluster::new)
            .join()
            .unwrap_or_else(|_| Err("embedded PostgreSQL bootstrap panicked".into()));
        match started {
            Ok(cluster) => TestServer::Embedded(cluster),
            Err(err) => panic!(
                "failed to start embedded PostgreSQL (set {DATABASE_URL_ENV} to use an existing server): {err}"
            ),
        }
    })
}
