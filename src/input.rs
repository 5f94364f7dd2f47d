use std::ops::{Index, IndexMut};

/// A store of f32 vector data indexed by a densely assigned range of values.
pub trait VectorStore: Index<usize, Output = [f32]> {
    /// Return the number of elements in each vector.
    fn elem_stride(&self) -> usize;

    /// Return the number of vectors in the store.
    fn len(&self) -> usize;

    /// Return true if this store is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return an iterator over all the vectors in the store.
    fn iter(&self) -> impl Iterator<Item = &[f32]>;
}

/// An owned, growable store of vectors that all have the same stride.
#[derive(Debug, Clone, PartialEq)]
pub struct VecVectorStore<E> {
    data: Vec<E>,
    elem_stride: usize,
}

impl<E: Clone> VecVectorStore<E> {
    /// Create an empty store for vectors of `elem_stride` elements.
    pub fn new(elem_stride: usize) -> Self {
        Self::with_capacity(elem_stride, 0)
    }

    /// Create an empty store with room for `capacity` vectors.
    pub fn with_capacity(elem_stride: usize, capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(elem_stride * capacity),
            elem_stride,
        }
    }

    /// Append `vector` to the store.
    ///
    /// Panics if `vector.len()` does not match the store stride; callers validate shape first.
    pub fn push(&mut self, vector: &[E]) {
        assert_eq!(vector.len(), self.elem_stride);
        self.data.extend_from_slice(vector);
    }
}

impl VectorStore for VecVectorStore<f32> {
    fn elem_stride(&self) -> usize {
        self.elem_stride
    }

    fn len(&self) -> usize {
        if self.elem_stride == 0 {
            0
        } else {
            self.data.len() / self.elem_stride
        }
    }

    fn iter(&self) -> impl Iterator<Item = &[f32]> {
        // chunks() panics on a zero chunk size; a zero stride store is always empty.
        self.data.chunks(self.elem_stride.max(1))
    }
}

impl<E> Index<usize> for VecVectorStore<E> {
    type Output = [E];

    fn index(&self, index: usize) -> &Self::Output {
        let start = index * self.elem_stride;
        &self.data[start..(start + self.elem_stride)]
    }
}

impl<E> IndexMut<usize> for VecVectorStore<E> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        let start = index * self.elem_stride;
        &mut self.data[start..(start + self.elem_stride)]
    }
}

/// A view over a subset of the vectors in another store.
///
/// Vectors in the view are densely indexed; use `original_index()` to map back to the parent.
pub struct SubsetViewVectorStore<'a, V> {
    parent: &'a V,
    subset: Vec<usize>,
}

impl<'a, V: VectorStore> SubsetViewVectorStore<'a, V> {
    /// Create a view of `parent` containing the vectors at each index in `subset`, in order.
    pub fn new(parent: &'a V, subset: Vec<usize>) -> Self {
        assert!(subset.iter().all(|i| *i < parent.len()));
        Self { parent, subset }
    }

    /// Map an index in this view to an index in the parent store.
    pub fn original_index(&self, index: usize) -> usize {
        self.subset[index]
    }
}

impl<V: VectorStore> VectorStore for SubsetViewVectorStore<'_, V> {
    fn elem_stride(&self) -> usize {
        self.parent.elem_stride()
    }

    fn len(&self) -> usize {
        self.subset.len()
    }

    fn iter(&self) -> impl Iterator<Item = &[f32]> {
        self.subset.iter().map(|i| &self.parent[*i])
    }
}

impl<V: VectorStore> Index<usize> for SubsetViewVectorStore<'_, V> {
    type Output = [f32];

    fn index(&self, index: usize) -> &Self::Output {
        &self.parent[self.subset[index]]
    }
}

/// Replace every NaN component of `vector` with 0.0.
///
/// Returns the number of components that were replaced.
pub fn sanitize_nan(vector: &mut [f32]) -> usize {
    let mut replaced = 0;
    for d in vector.iter_mut().filter(|d| d.is_nan()) {
        *d = 0.0;
        replaced += 1;
    }
    replaced
}
