pub mod dispatch;
pub mod evi_lite;
pub mod mock;
pub mod plot;
pub mod run;
pub mod sink;
pub mod traits;

pub use dispatch::{CompletedTask, Completions, DispatchConfig, Dispatcher, TaskOutcome};
pub use evi_lite::EviProLiteClient;
pub use mock::{DummyChargingModel, DummyPlotter};
pub use plot::SvgLoadPlotter;
pub use run::ProjectionPipeline;
pub use sink::{FailedCounty, PersistedCounty, ResultSink, RunManifest};
pub use traits::{ChargingModel, LoadPlotter};
