pub mod atr;
pub mod liquidity;
pub mod session;
pub mod structure;
pub mod volatility;

pub use atr::{atr_series, average_true_range};
pub use liquidity::{liquidity_label, Liquidity};
pub use session::{session_for_hour, session_label, Session};
pub use structure::{market_structure, MarketStructure, StructureBreak, Trend};
pub use volatility::{volatility_regime, VolatilityRegime};
