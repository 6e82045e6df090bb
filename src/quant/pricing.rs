//! # Pricing
//!
//! $$
//! V_t=e^{-r(T-t)}\,\mathbb E^{\mathbb Q}\!\left[\Pi(S_T)\mid S_t\right]
//! $$
//!
pub mod bsm;
