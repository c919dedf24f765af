//! Response validation and the structured analysis result

mod band;
mod result;
mod validator;

pub use band::ScoreBand;
pub use result::{AnalysisResult, CitedSource, Recommendation};
pub use validator::ResponseValidator;
