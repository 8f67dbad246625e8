/// A trait for vector-like types usable as evaluation inputs and gradient
/// outputs.
///
/// This trait provides a common interface over the container types an
/// expression can be evaluated against. Variable values are read through
/// [`as_slice`](Vector::as_slice); gradient buffers are allocated with
/// [`zeros`](Vector::zeros) and written through
/// [`as_mut_slice`](Vector::as_mut_slice), so gradients come back in the same
/// container family the caller evaluated with.
///
/// # Examples
///
/// ```rust
/// use gradexpr::prelude::Vector;
///
/// // Create a zero vector
/// let vec: Vec<f64> = Vector::zeros(5);
/// assert_eq!(vec.len(), 5);
///
/// // Access elements
/// let vec = vec![1.0, 2.0, 3.0];
/// let slice = vec.as_slice();
/// assert_eq!(slice[0], 1.0);
/// ```
pub trait Vector {
    /// Returns a reference to the vector's data as a slice.
    fn as_slice(&self) -> &[f64];

    /// Returns a mutable reference to the vector's data as a slice.
    fn as_mut_slice(&mut self) -> &mut [f64];

    /// Creates a new vector of the specified length filled with zeros.
    ///
    /// # Arguments
    /// * `len` - The length of the vector to create
    fn zeros(len: usize) -> Self;

    /// Returns the length of the vector.
    fn len(&self) -> usize;

    /// Checks if the vector is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Implementation of Vector trait for standard Vec<f64>.
impl Vector for Vec<f64> {
    fn as_slice(&self) -> &[f64] {
        self
    }

    fn as_mut_slice(&mut self) -> &mut [f64] {
        self
    }

    fn zeros(len: usize) -> Self {
        vec![0.0; len]
    }

    fn len(&self) -> usize {
        self.len()
    }
}

/// Implementation of Vector trait for fixed-size arrays.
///
/// The array size is specified through the const generic parameter N;
/// [`zeros`](Vector::zeros) asserts that the requested length matches it.
impl<const N: usize> Vector for [f64; N] {
    fn as_slice(&self) -> &[f64] {
        self
    }

    fn as_mut_slice(&mut self) -> &mut [f64] {
        self
    }

    fn zeros(len: usize) -> Self {
        assert_eq!(len, N, "Array length must match const generic size");
        [0.0; N]
    }

    fn len(&self) -> usize {
        N
    }
}

/// Implementation of Vector trait for ndarray's Array1<f64>.
///
/// Owned 1-dimensional arrays are contiguous, so slice access cannot fail.
#[cfg(feature = "ndarray")]
impl Vector for ndarray::Array1<f64> {
    fn as_slice(&self) -> &[f64] {
        self.as_slice().unwrap()
    }

    fn as_mut_slice(&mut self) -> &mut [f64] {
        self.as_slice_mut().unwrap()
    }

    fn zeros(len: usize) -> Self {
        ndarray::Array1::zeros(len)
    }

    fn len(&self) -> usize {
        self.len()
    }
}

/// Implementation of Vector trait for nalgebra's DVector<f64>.
#[cfg(feature = "nalgebra")]
impl Vector for nalgebra::DVector<f64> {
    fn as_slice(&self) -> &[f64] {
        self.as_slice()
    }

    fn as_mut_slice(&mut self) -> &mut [f64] {
        self.as_mut_slice()
    }

    fn zeros(len: usize) -> Self {
        nalgebra::DVector::zeros(len)
    }

    fn len(&self) -> usize {
        self.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_roundtrip() {
        let mut vec: Vec<f64> = Vector::zeros(3);
        assert!(!Vector::is_empty(&vec));
        vec.as_mut_slice()[1] = 2.5;
        assert_eq!(Vector::as_slice(&vec), &[0.0, 2.5, 0.0]);
    }

    #[test]
    fn test_array_roundtrip() {
        let mut arr = <[f64; 2]>::zeros(2);
        arr.as_mut_slice()[0] = 1.0;
        assert_eq!(Vector::as_slice(&arr), &[1.0, 0.0]);
    }

    #[test]
    #[should_panic]
    fn test_array_zeros_length_mismatch() {
        let _ = <[f64; 2]>::zeros(3);
    }
}
