//! Survey result recording and aggregation.
//!
//! Writes go through [`save_survey_result`], which validates the answer
//! against the survey and upserts one record per participant. Reads go
//! through [`load_survey_result`]. Both return a freshly aggregated
//! [`SurveyResultView`](crate::models::SurveyResultView).

mod aggregate;
mod load;
mod save;

pub use aggregate::{aggregate, percent};
pub use load::load_survey_result;
pub use save::{save_survey_result, SaveSurveyResult};
