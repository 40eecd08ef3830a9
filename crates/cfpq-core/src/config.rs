use crate::error::CfpqError;
use crate::filter::SelfPairs;
use std::fmt;
use std::str::FromStr;

/// Which fixpoint engine answers a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum Algorithm {
    /// Worklist triple propagation.
    #[default]
    Hellings,
    /// Semi-naive boolean matrix closure.
    Matrix,
    /// Kronecker products against a recursive state machine.
    Tensor,
}

impl Algorithm {
    pub const ALL: [Algorithm; 3] = [Algorithm::Hellings, Algorithm::Matrix, Algorithm::Tensor];

    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Hellings => "hellings",
            Algorithm::Matrix => "matrix",
            Algorithm::Tensor => "tensor",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = CfpqError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hellings" => Ok(Algorithm::Hellings),
            "matrix" => Ok(Algorithm::Matrix),
            "tensor" => Ok(Algorithm::Tensor),
            other => Err(CfpqError::undefined(format!("algorithm '{other}'"))),
        }
    }
}

/// Knobs for one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfpqConfig {
    pub algorithm: Algorithm,
    pub self_pairs: SelfPairs,
    /// Evaluate the rules of a matrix round on the rayon pool.
    pub parallel: bool,
}

impl Default for CfpqConfig {
    fn default() -> Self {
        CfpqConfig {
            algorithm: Algorithm::Hellings,
            self_pairs: SelfPairs::Keep,
            parallel: true,
        }
    }
}

impl CfpqConfig {
    pub fn new(algorithm: Algorithm) -> Self {
        CfpqConfig {
            algorithm,
            ..Self::default()
        }
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_self_pairs(mut self, self_pairs: SelfPairs) -> Self {
        self.self_pairs = self_pairs;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_algorithm() {
        for a in Algorithm::ALL {
            assert_eq!(a.to_string().parse::<Algorithm>().unwrap(), a);
        }
        assert_eq!(" Matrix ".parse::<Algorithm>().unwrap(), Algorithm::Matrix);
        assert!(matches!(
            "cyk".parse::<Algorithm>(),
            Err(CfpqError::UndefinedSymbol(_))
        ));
    }

    #[test]
    fn test_builder() {
        let c = CfpqConfig::default()
            .with_algorithm(Algorithm::Tensor)
            .with_self_pairs(SelfPairs::Exclude)
            .with_parallel(false);
        assert_eq!(c.algorithm, Algorithm::Tensor);
        assert_eq!(c.self_pairs, SelfPairs::Exclude);
        assert!(!c.parallel);
        assert_eq!(CfpqConfig::new(Algorithm::Matrix).self_pairs, SelfPairs::Keep);
    }
}
