// Checked arithmetic and safe casts, used by the const evaluator to turn
// integer overflow into a diagnostic instead of a panic or silent wraparound.

use std::fmt;

/// Error type for arithmetic operations
#[derive(Debug, Clone)]
pub struct ArithmeticError {
    pub message: String,
}

impl fmt::Display for ArithmeticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Arithmetic error: {}", self.message)
    }
}

impl std::error::Error for ArithmeticError {}

impl From<ArithmeticError> for String {
    fn from(err: ArithmeticError) -> String {
        err.message
    }
}

/// Trait providing checked arithmetic operations
pub trait CheckedArithmetic: Sized {
    /// Safely add two values, returning error on overflow
    fn safe_add(&self, rhs: Self) -> Result<Self, ArithmeticError>;
    
    /// Safely multiply two values, returning error on overflow
    fn safe_mul(&self, rhs: Self) -> Result<Self, ArithmeticError>;
    
    /// Safely subtract two values, returning error on overflow
    fn safe_sub(&self, rhs: Self) -> Result<Self, ArithmeticError>;
}

/// Trait for safe type conversions
pub trait SafeCast<T> {
    /// Safely cast to target type, returning error if value doesn't fit
    fn safe_cast(&self) -> Result<T, ArithmeticError>;
}

// Implementations for usize
impl CheckedArithmetic for usize {
    fn safe_add(&self, rhs: Self) -> Result<Self, ArithmeticError> {
        self.checked_add(rhs).ok_or_else(|| ArithmeticError {
            message: format!("Overflow in addition: {} + {}", self, rhs),
        })
    }
    
    fn safe_mul(&self, rhs: Self) -> Result<Self, ArithmeticError> {
        self.checked_mul(rhs).ok_or_else(|| ArithmeticError {
            message: format!("Overflow in multiplication: {} * {}", self, rhs),
        })
    }
    
    fn safe_sub(&self, rhs: Self) -> Result<Self, ArithmeticError> {
        self.checked_sub(rhs).ok_or_else(|| ArithmeticError {
            message: format!("Overflow in subtraction: {} - {}", self, rhs),
        })
    }
}

impl SafeCast<u32> for usize {
    fn safe_cast(&self) -> Result<u32, ArithmeticError> {
        u32::try_from(*self).map_err(|_| ArithmeticError {
            message: format!("Cannot cast {} (usize) to u32: value too large", self),
        })
    }
}

impl SafeCast<i32> for usize {
    fn safe_cast(&self) -> Result<i32, ArithmeticError> {
        i32::try_from(*self).map_err(|_| ArithmeticError {
            message: format!("Cannot cast {} (usize) to i32: value too large", self),
        })
    }
}

// Implementations for u32
impl CheckedArithmetic for u32 {
    fn safe_add(&self, rhs: Self) -> Result<Self, ArithmeticError> {
        self.checked_add(rhs).ok_or_else(|| ArithmeticError {
            message: format!("Overflow in addition: {} + {}", self, rhs),
        })
    }
    
    fn safe_mul(&self, rhs: Self) -> Result<Self, ArithmeticError> {
        self.checked_mul(rhs).ok_or_else(|| ArithmeticError {
            message: format!("Overflow in multiplication: {} * {}", self, rhs),
        })
    }
    
    fn safe_sub(&self, rhs: Self) -> Result<Self, ArithmeticError> {
        self.checked_sub(rhs).ok_or_else(|| ArithmeticError {
            message: format!("Overflow in subtraction: {} - {}", self, rhs),
        })
    }
}

impl SafeCast<usize> for u32 {
    fn safe_cast(&self) -> Result<usize, ArithmeticError> {
        Ok(*self as usize) // u32 always fits in usize on 32-bit+ platforms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_add_success() {
        assert_eq!(5usize.safe_add(3).unwrap(), 8);
        assert_eq!(100u32.safe_add(50).unwrap(), 150);
    }

    #[test]
    fn test_safe_add_overflow() {
        let result = usize::MAX.safe_add(1);
        assert!(result.is_err());
        assert!(result.unwrap_err().message.contains("Overflow"));
    }

    #[test]
    fn test_safe_cast_u32_success() {
        let value = 42usize;
        let result: u32 = value.safe_cast().unwrap();
        assert_eq!(result, 42u32);
    }

    #[test]
    fn test_safe_cast_u32_overflow() {
        let value = (u32::MAX as usize) + 1;
        let result: Result<u32, _> = value.safe_cast();
        assert!(result.is_err());
    }
}
