//! Discrete Gaussian kernel.
//!
//! Coefficients are `exp(-t) I_n(t)` for variance `t`, where `I_n` are the
//! modified Bessel functions of the first kind. Terms are added until the
//! kernel holds `1 - max_error` of the mass or the width cap is reached, then
//! normalised to sum to one.

/// Default cap on the kernel width.
pub const DEFAULT_MAX_KERNEL_WIDTH: usize = 256;

/// Default truncation error.
pub const DEFAULT_MAX_ERROR: f64 = 0.001;

/// Symmetric discrete Gaussian kernel of odd length.
///
/// A non-positive variance yields the identity kernel `[1.0]`.
pub fn discrete_gaussian_kernel(variance: f64, max_error: f64, max_width: usize) -> Vec<f64> {
    if variance <= 0.0 || !variance.is_finite() {
        return vec![1.0];
    }
    let max_error = max_error.clamp(f64::EPSILON, 0.5);
    let max_half = (max_width.max(1) - 1) / 2;

    let et = (-variance).exp();
    let cap = 1.0 - max_error;
    let mut half = vec![et * bessel_i0(variance)];
    let mut sum = half[0];
    if max_half > 0 {
        half.push(et * bessel_i1(variance));
        sum += 2.0 * half[1];
    }

    let mut n = 2;
    while sum < cap && half.len() <= max_half {
        let next = et * bessel_in(n, variance);
        if next <= sum * f64::EPSILON {
            break;
        }
        half.push(next);
        sum += 2.0 * next;
        n += 1;
    }
    if sum < cap {
        tracing::debug!(variance, width = 2 * half.len() - 1, "Gaussian kernel truncated at maximum width");
    }

    let mut kernel: Vec<f64> = half.iter().skip(1).rev().chain(half.iter()).map(|c| c / sum).collect();
    let total: f64 = kernel.iter().sum();
    kernel.iter_mut().for_each(|c| *c /= total);
    kernel
}

/// Modified Bessel function of the first kind, order 0.
fn bessel_i0(y: f64) -> f64 {
    let d = y.abs();
    if d < 3.75 {
        let m = (y / 3.75).powi(2);
        1.0 + m * (3.5156229 + m * (3.0899424 + m * (1.2067492 + m * (0.2659732 + m * (0.0360768 + m * 0.0045813)))))
    } else {
        let m = 3.75 / d;
        (d.exp() / d.sqrt())
            * (0.39894228
                + m * (0.01328592
                    + m * (0.00225319
                        + m * (-0.00157565
                            + m * (0.00916281
                                + m * (-0.02057706 + m * (0.02635537 + m * (-0.01647633 + m * 0.00392377))))))))
    }
}

/// Modified Bessel function of the first kind, order 1.
fn bessel_i1(y: f64) -> f64 {
    let d = y.abs();
    let value = if d < 3.75 {
        let m = (y / 3.75).powi(2);
        d * (0.5 + m * (0.87890594 + m * (0.51498869 + m * (0.15084934 + m * (0.02658733 + m * (0.00301532 + m * 0.00032411))))))
    } else {
        let m = 3.75 / d;
        let tail = 0.02282967 + m * (-0.02895312 + m * (0.01787654 - m * 0.00420059));
        let poly = 0.39894228 + m * (-0.03988024 + m * (-0.00362018 + m * (0.00163801 + m * (-0.01031555 + m * tail))));
        poly * d.exp() / d.sqrt()
    };
    if y < 0.0 { -value } else { value }
}

/// Modified Bessel function of the first kind, order `n >= 2`, by downward
/// recurrence normalised against `I_0`.
fn bessel_in(n: usize, y: f64) -> f64 {
    const ACC: f64 = 40.0;
    const BIG: f64 = 1.0e10;
    if y == 0.0 {
        return 0.0;
    }
    let tox = 2.0 / y.abs();
    let mut bip = 0.0;
    let mut bi = 1.0;
    let mut ans = 0.0;
    let start = 2 * (n + (ACC * n as f64).sqrt() as usize);
    for j in (1..=start).rev() {
        let bim = bip + j as f64 * tox * bi;
        bip = bi;
        bi = bim;
        if bi.abs() > BIG {
            ans /= BIG;
            bi /= BIG;
            bip /= BIG;
        }
        if j == n {
            ans = bip;
        }
    }
    let value = ans * bessel_i0(y) / bi;
    if y < 0.0 && n % 2 == 1 { -value } else { value }
}
