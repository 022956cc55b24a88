//! Black–Scholes–Merton closed form for European options with continuous
//! rates and dividend yield.
//!
//! Used as the reference price for lattice convergence and as a quick
//! cross-check of calibrated lattices on flat surfaces.

use lv_core::{OptionType, Price, Rate, Real, Time, Volatility};

use crate::distributions::normal_cdf;

/// European option price under Black–Scholes–Merton.
///
/// For `t <= 0` or a vanishing total volatility the discounted intrinsic
/// value of the forward is returned.
pub fn black_scholes_price(
    option_type: OptionType,
    spot: Real,
    strike: Real,
    t: Time,
    volatility: Volatility,
    risk_free_rate: Rate,
    dividend_yield: Rate,
) -> Price {
    let phi = option_type.sign();
    if t <= 0.0 {
        return (phi * (spot - strike)).max(0.0);
    }

    let df_r = (-risk_free_rate * t).exp();
    let df_q = (-dividend_yield * t).exp();
    let std_dev = volatility * t.sqrt();
    if std_dev <= 1e-15 {
        return (phi * (spot * df_q - strike * df_r)).max(0.0);
    }

    let d1 = ((spot / strike).ln() + (risk_free_rate - dividend_yield) * t) / std_dev
        + 0.5 * std_dev;
    let d2 = d1 - std_dev;
    phi * (spot * df_q * normal_cdf(phi * d1) - strike * df_r * normal_cdf(phi * d2))
}
