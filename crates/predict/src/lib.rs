pub mod churn;
pub mod forecast;
pub mod optimize;
pub mod sarima;
pub mod table;

pub use churn::{score_churn, Bucket, ChurnError, ChurnScore};
pub use forecast::{
    forecast_table, Forecast, ForecastError, ForecastRequest, Frequency, Prediction,
};
pub use sarima::{FitError, SarimaFit, SarimaParams};
pub use table::{Table, TableError};
