pub mod dispatch;
pub mod gateway;
pub mod http;
pub mod reconcile;
pub mod report;

pub use dispatch::{DeployOutcome, DispatchError, DispatchReport, Dispatcher, FunctionDeploy};
pub use gateway::{DeployRequest, Gateway, GatewayError};
pub use http::HttpGateway;
pub use reconcile::{ReconcileError, ReconcileReport, Reconciler, orphans};
pub use report::{ReportError, StatusReporter};
