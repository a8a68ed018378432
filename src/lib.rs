pub mod cli;
pub mod config;
pub mod error;
pub mod invoker;
pub mod logging;
pub mod ml;
pub mod payload;
pub mod serving;
pub mod training;

pub use config::AppConfig;
pub use error::{LifeboatError, Result};
pub use invoker::{EndpointClient, HttpEndpointClient, Invoker, InvokerResponse};
pub use ml::{Model, ModelArtifact, PredictionResult};
pub use payload::FeatureMatrix;
pub use serving::{create_router, InferenceServer, InferenceService};
pub use training::{TrainReport, TrainingJob};
