//! Plain numeric functions used by the primitive operations.
//!
//! Nothing here knows about the graph. The `*_back` helpers return the
//! derivative of the named function at `x` multiplied by `d`.

/// Natural logarithm.
pub fn log(x: f64) -> f64 {
    x.ln()
}

pub fn exp(x: f64) -> f64 {
    x.exp()
}

/// 1 / x
pub fn inv(x: f64) -> f64 {
    1.0 / x
}

/// Logistic sigmoid, computed without overflowing `exp` for large |x|.
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

pub fn relu(x: f64) -> f64 {
    if x > 0.0 {
        x
    } else {
        0.0
    }
}

/// 1.0 if x < y, else 0.0.
pub fn lt(x: f64, y: f64) -> f64 {
    if x < y {
        1.0
    } else {
        0.0
    }
}

/// 1.0 if x == y, else 0.0.
pub fn eq(x: f64, y: f64) -> f64 {
    if x == y {
        1.0
    } else {
        0.0
    }
}

/// d/dx ln(x) * d
pub fn log_back(x: f64, d: f64) -> f64 {
    d / x
}

/// d/dx (1/x) * d
pub fn inv_back(x: f64, d: f64) -> f64 {
    -d / (x * x)
}

/// d/dx relu(x) * d. The derivative at 0 is taken to be 0.
pub fn relu_back(x: f64, d: f64) -> f64 {
    if x > 0.0 {
        d
    } else {
        0.0
    }
}
