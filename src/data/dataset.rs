use std::ops::Range;

use super::error::DataResult;

/// One named axis of a variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    pub name: String,
    pub len: usize,
}

impl Dimension {
    pub fn new(name: impl Into<String>, len: usize) -> Self {
        Self {
            name: name.into(),
            len,
        }
    }
}

/// A lazily-read gridded dataset.
///
/// Implementations only touch their backing store when a coordinate or a
/// hyperslab is requested. Callers close the handle when done with it.
pub trait Dataset {
    /// Dimensions of `variable`, outermost first.
    fn dimensions(&self, variable: &str) -> DataResult<Vec<Dimension>>;

    /// Values of the 1-D coordinate variable `name`.
    ///
    /// Time coordinates are returned as seconds since the Unix epoch.
    fn coordinate(&self, name: &str) -> DataResult<Vec<f64>>;

    /// Read a hyperslab of `variable`: one index range per dimension, values
    /// returned in row-major order.
    fn read(&self, variable: &str, slab: &[Range<usize>]) -> DataResult<Vec<f32>>;

    /// Release the handle.
    fn close(self: Box<Self>) {}
}

/// Something that can hand out a fresh [`Dataset`] handle per request.
pub trait DatasetSource {
    fn open(&self) -> DataResult<Box<dyn Dataset>>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory dataset used by the data-layer tests.

    use std::cell::Cell;
    use std::collections::BTreeMap;
    use std::rc::Rc;

    use super::*;
    use crate::data::error::DataError;

    #[derive(Debug, Clone, Default)]
    pub struct MemoryDataset {
        pub variables: BTreeMap<String, (Vec<Dimension>, Vec<f32>)>,
        pub coordinates: BTreeMap<String, Vec<f64>>,
        pub closed: Rc<Cell<usize>>,
    }

    impl MemoryDataset {
        pub fn with_coordinate(mut self, name: &str, values: Vec<f64>) -> Self {
            self.coordinates.insert(name.to_string(), values);
            self
        }

        /// Add a variable; `dims` pairs each name with its coordinate length.
        pub fn with_variable(mut self, name: &str, dims: &[(&str, usize)], data: Vec<f32>) -> Self {
            let dims = dims.iter().map(|(n, l)| Dimension::new(*n, *l)).collect();
            self.variables.insert(name.to_string(), (dims, data));
            self
        }
    }

    impl Dataset for MemoryDataset {
        fn dimensions(&self, variable: &str) -> DataResult<Vec<Dimension>> {
            self.variables
                .get(variable)
                .map(|(d, _)| d.clone())
                .ok_or_else(|| DataError::MissingVariable(variable.to_string()))
        }

        fn coordinate(&self, name: &str) -> DataResult<Vec<f64>> {
            self.coordinates
                .get(name)
                .cloned()
                .ok_or_else(|| DataError::MissingCoordinate(name.to_string()))
        }

        fn read(&self, variable: &str, slab: &[Range<usize>]) -> DataResult<Vec<f32>> {
            let (dims, data) = self
                .variables
                .get(variable)
                .ok_or_else(|| DataError::MissingVariable(variable.to_string()))?;
            assert_eq!(dims.len(), slab.len(), "hyperslab rank");

            let mut strides = vec![1usize; dims.len()];
            for i in (0..dims.len().saturating_sub(1)).rev() {
                strides[i] = strides[i + 1] * dims[i + 1].len;
            }

            let mut out = Vec::new();
            let mut index: Vec<usize> = slab.iter().map(|r| r.start).collect();
            if slab.iter().any(|r| r.is_empty()) {
                return Ok(out);
            }
            loop {
                let flat: usize = index.iter().zip(&strides).map(|(i, s)| i * s).sum();
                out.push(data[flat]);
                // Odometer increment, last axis fastest.
                let mut axis = slab.len();
                loop {
                    if axis == 0 {
                        return Ok(out);
                    }
                    axis -= 1;
                    index[axis] += 1;
                    if index[axis] < slab[axis].end {
                        break;
                    }
                    index[axis] = slab[axis].start;
                }
            }
        }

        fn close(self: Box<Self>) {
            self.closed.set(self.closed.get() + 1);
        }
    }

    /// A source that hands out clones of one in-memory dataset.
    pub struct MemorySource {
        pub dataset: MemoryDataset,
        pub opens: Cell<usize>,
        /// Opens beyond this count fail as if the server went away.
        pub fail_after: Option<usize>,
    }

    impl MemorySource {
        pub fn new(dataset: MemoryDataset) -> Self {
            Self {
                dataset,
                opens: Cell::new(0),
                fail_after: None,
            }
        }

        pub fn failing_after(mut self, opens: usize) -> Self {
            self.fail_after = Some(opens);
            self
        }
    }

    impl DatasetSource for MemorySource {
        fn open(&self) -> DataResult<Box<dyn Dataset>> {
            self.opens.set(self.opens.get() + 1);
            if self.fail_after.is_some_and(|n| self.opens.get() > n) {
                return Err(DataError::Protocol("offline".into()));
            }
            Ok(Box::new(self.dataset.clone()))
        }
    }

    #[test]
    fn hyperslab_reads_row_major() {
        let ds = MemoryDataset::default().with_variable(
            "v",
            &[("a", 2), ("b", 3)],
            vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0],
        );
        assert_eq!(ds.read("v", &[1..2, 0..3]).unwrap(), vec![3.0, 4.0, 5.0]);
        assert_eq!(ds.read("v", &[0..2, 2..3]).unwrap(), vec![2.0, 5.0]);
    }
}
