//! Number accumulator: fixed-width first, promoting to an arbitrary-precision
//! decimal-literal buffer on overflow.

use crate::value::Value;

/// `i, frac, exp` all stay below this bound while unpromoted (see spec
/// §4.2 "Numeric semantics"): `2^63 - 1`.
const MAX_MAGNITUDE: u64 = i64::MAX as u64;

/// Accumulates the digits of a single JSON number across however many bytes
/// (and, for `ParseReader`, however many chunks) it takes to see them all.
///
/// While [`NumberAccumulator::big`] is empty the number is representable as
/// `(neg ? -1 : 1) * (i + frac/div) * 10^(neg_exp ? -exp : exp)`. The moment
/// any component would overflow, the textual form seen so far is copied into
/// `big` and every later character is appended there instead — this is
/// "promotion" (see spec GLOSSARY).
#[derive(Debug, Clone, Default)]
pub struct NumberAccumulator {
    neg: bool,
    i: u64,
    has_frac: bool,
    frac: u64,
    div: f64,
    neg_exp: bool,
    has_exp: bool,
    exp: u64,
    big: Option<String>,
}

impl NumberAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.neg = false;
        self.i = 0;
        self.has_frac = false;
        self.frac = 0;
        self.div = 1.0;
        self.neg_exp = false;
        self.has_exp = false;
        self.exp = 0;
        if let Some(big) = &mut self.big {
            big.clear();
        }
        self.big = None;
    }

    pub fn set_neg(&mut self) {
        self.neg = true;
        if let Some(big) = &mut self.big {
            big.push('-');
        }
    }

    fn is_promoted(&self) -> bool {
        self.big.is_some()
    }

    /// Render the unpromoted numeric state back into its original decimal
    /// text. Used both to seed `big` on promotion and as the fallback
    /// literal when a non-promoted value turns out not to fit in `f64`.
    fn render_text(&self) -> String {
        let mut s = String::new();
        if self.neg {
            s.push('-');
        }
        s.push_str(&self.i.to_string());
        if self.has_frac {
            s.push('.');
            // frac/div digits: div is 10^(number of fractional digits seen).
            let digits = self.div.log10().round() as u32;
            let frac_str = format!("{:0width$}", self.frac, width = digits as usize);
            s.push_str(&frac_str);
        }
        if self.has_exp {
            s.push('e');
            if self.neg_exp {
                s.push('-');
            }
            s.push_str(&self.exp.to_string());
        }
        s
    }

    /// Materialize the numeric prefix accumulated so far into `big` so that
    /// appending subsequent raw characters reproduces the original text.
    fn fill_big(&mut self) {
        if self.big.is_some() {
            return;
        }
        self.big = Some(self.render_text());
    }

    pub fn add_digit(&mut self, b: u8) {
        let digit = u64::from(b - b'0');
        if self.is_promoted() {
            self.big.as_mut().unwrap().push(b as char);
            return;
        }
        match self.i.checked_mul(10).and_then(|v| v.checked_add(digit)) {
            Some(v) if v <= MAX_MAGNITUDE => self.i = v,
            _ => {
                self.fill_big();
                self.big.as_mut().unwrap().push(b as char);
            }
        }
    }

    pub fn add_frac(&mut self, b: u8) {
        let digit = u64::from(b - b'0');
        self.has_frac = true;
        if self.is_promoted() {
            self.big.as_mut().unwrap().push(b as char);
            return;
        }
        let new_frac = self.frac.checked_mul(10).and_then(|v| v.checked_add(digit));
        let new_div = self.div * 10.0;
        match new_frac {
            Some(v) if v <= MAX_MAGNITUDE && new_div <= MAX_MAGNITUDE as f64 => {
                self.frac = v;
                self.div = new_div;
            }
            _ => {
                self.fill_big();
                self.big.as_mut().unwrap().push(b as char);
            }
        }
    }

    pub fn set_exp_sign(&mut self, neg: bool) {
        self.neg_exp = neg;
        self.has_exp = true;
        if neg {
            if let Some(big) = &mut self.big {
                big.push('-');
            }
        }
    }

    pub fn add_exp(&mut self, b: u8) {
        let digit = u64::from(b - b'0');
        self.has_exp = true;
        if self.is_promoted() {
            self.big.as_mut().unwrap().push(b as char);
            return;
        }
        match self.exp.checked_mul(10).and_then(|v| v.checked_add(digit)) {
            Some(v) if v <= MAX_MAGNITUDE => self.exp = v,
            _ => {
                self.fill_big();
                self.big.as_mut().unwrap().push(b as char);
            }
        }
    }

    /// Called when the exponent itself begins (`e`/`E` seen) but before any
    /// sign or digit, so that `fill_big` (if promotion later happens) renders
    /// the `e` marker even though `has_exp` tracking only flips true once a
    /// sign or digit arrives.
    pub fn begin_exp(&mut self) {
        if let Some(big) = &mut self.big {
            big.push('e');
        }
    }

    /// Yield the typed result per spec §3: `Int` if there's no fractional or
    /// exponent part and no promotion, `Float` if fractional/exponential and
    /// unpromoted, otherwise `Big` with the original text preserved.
    #[must_use]
    pub fn as_value(&self) -> Value {
        if let Some(big) = &self.big {
            return Value::Big(big.clone());
        }
        if !self.has_frac && !self.has_exp {
            // "-0" parses as Int(0): there is no negative-zero integer.
            let magnitude = self.i as i64;
            return Value::Int(if self.neg { -magnitude } else { magnitude });
        }
        let mut value = self.i as f64;
        if self.has_frac {
            value += self.frac as f64 / self.div;
        }
        if self.neg {
            value = -value;
        }
        if self.has_exp {
            let e = self.exp as f64;
            let e = if self.neg_exp { -e } else { e };
            value *= 10f64.powf(e);
        }
        if !value.is_finite() {
            // The exponent fit comfortably in a u64 but the result doesn't
            // fit in f64 (e.g. `0.1e20000`): fall back to the exact text
            // rather than silently returning +/-inf.
            return Value::Big(self.render_text());
        }
        Value::Float(value)
    }
}
