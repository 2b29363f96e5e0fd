//! Strided GEMM used by the `Matrix` products.
//!
//! - default: a safe triple loop
//! - optional: the `matrixmultiply` crate (feature `matrixmultiply`)
//!
//! Transposed operands are expressed by swapping strides, so no product ever
//! materialises a transposed copy.

/// Read-only strided view over a row-major buffer.
#[derive(Debug, Clone, Copy)]
pub(crate) struct View<'a> {
    pub data: &'a [f32],
    /// Row stride.
    pub rs: usize,
    /// Column stride.
    pub cs: usize,
}

impl<'a> View<'a> {
    #[inline]
    pub(crate) fn row_major(data: &'a [f32], cols: usize) -> Self {
        Self {
            data,
            rs: cols,
            cs: 1,
        }
    }

    /// View a row-major `(rows, cols)` buffer as its `(cols, rows)` transpose.
    #[inline]
    pub(crate) fn transposed(data: &'a [f32], cols: usize) -> Self {
        Self {
            data,
            rs: 1,
            cs: cols,
        }
    }
}

/// `c = a . b` where `a` is `(m, k)`, `b` is `(k, n)` and `c` is row-major `(m, n)`.
///
/// `c` is overwritten.
#[inline]
pub(crate) fn gemm_f32(m: usize, n: usize, k: usize, a: View<'_>, b: View<'_>, c: &mut [f32]) {
    debug_assert_eq!(c.len(), m * n);
    if m == 0 || n == 0 {
        return;
    }
    if k == 0 {
        c.fill(0.0);
        return;
    }

    #[cfg(feature = "matrixmultiply")]
    {
        // SAFETY: every view indexes inside its buffer for the given dims; callers
        // in `tensor` check the shapes before building the views.
        unsafe {
            matrixmultiply::sgemm(
                m,
                k,
                n,
                1.0,
                a.data.as_ptr(),
                a.rs as isize,
                a.cs as isize,
                b.data.as_ptr(),
                b.rs as isize,
                b.cs as isize,
                0.0,
                c.as_mut_ptr(),
                n as isize,
                1,
            );
        }
    }

    #[cfg(not(feature = "matrixmultiply"))]
    for i in 0..m {
        let a0 = i * a.rs;
        let out = &mut c[i * n..(i + 1) * n];
        for (j, slot) in out.iter_mut().enumerate() {
            let b0 = j * b.cs;
            let mut acc = 0.0_f32;
            for p in 0..k {
                acc = a.data[a0 + p * a.cs].mul_add(b.data[p * b.rs + b0], acc);
            }
            *slot = acc;
        }
    }
}
