use crate::device::{BufferId, GpuDriver};
use crate::error::{MosaicError, Result};

use super::{GeometrySource, VertexElement};

/// Smallest backing allocation, in vertices.
const MIN_CAPACITY: usize = 64;

/// One addressable geometry inside a [`GeometryBuffer`].
#[derive(Debug, Clone)]
pub struct GeometryRecord<S> {
    pub source: S,
    pub vertex_offset: usize,
    pub vertex_count: usize,
}

impl<S> GeometryRecord<S> {
    /// One past the last vertex of this slot.
    #[inline]
    pub fn vertex_end(&self) -> usize {
        self.vertex_offset + self.vertex_count
    }
}

/// Growable vertex array packing many geometries back to back.
///
/// Slots are addressed by index. Offsets increase with the slot index and
/// the last slot ends at [`num_vertices`](Self::num_vertices). Removing a
/// slot shifts every later slot (and its index) down by one.
///
/// GPU sync is incremental: dirty slots are tracked as one inclusive index
/// interval and a flush uploads the byte span covering it. A capacity change
/// forces a full upload instead.
#[derive(Debug)]
pub struct GeometryBuffer<V, S> {
    records: Vec<GeometryRecord<S>>,
    /// Backing storage; its length is the capacity. `top` vertices are live.
    vertices: Vec<V>,
    top: usize,

    dirty: Option<(usize, usize)>,
    scratch: Vec<V>,

    buffer: Option<BufferId>,
    uploaded_capacity: Option<usize>,
}

impl<V: VertexElement, S: GeometrySource<V>> Default for GeometryBuffer<V, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: VertexElement, S: GeometrySource<V>> GeometryBuffer<V, S> {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            vertices: Vec::new(),
            top: 0,
            dirty: None,
            scratch: Vec::new(),
            buffer: None,
            uploaded_capacity: None,
        }
    }

    /// Live vertex count (the "top index").
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.top
    }

    /// Number of geometry slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Allocated vertices.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.vertices.len()
    }

    pub fn record(&self, index: usize) -> Option<&GeometryRecord<S>> {
        self.records.get(index)
    }

    pub fn records(&self) -> &[GeometryRecord<S>] {
        &self.records
    }

    /// Mutable access to a slot's generator. Call
    /// [`update_geometry`](Self::update_geometry) afterwards to regenerate.
    pub fn source_mut(&mut self, index: usize) -> Option<&mut S> {
        self.records.get_mut(index).map(|r| &mut r.source)
    }

    /// Live vertices.
    pub fn vertices(&self) -> &[V] {
        &self.vertices[..self.top]
    }

    /// Pending dirty slot interval, inclusive.
    pub fn dirty_range(&self) -> Option<(usize, usize)> {
        self.dirty
    }

    pub fn gpu_buffer(&self) -> Option<BufferId> {
        self.buffer
    }

    fn mark_dirty(&mut self, first: usize, last: usize) {
        self.dirty = Some(match self.dirty {
            Some((lo, hi)) => (lo.min(first), hi.max(last)),
            None => (first, last),
        });
    }

    /// Runs `source` into the scratch buffer and checks its vertex count.
    fn generate(&mut self, source: &S, declared: usize) -> Result<()> {
        self.scratch.clear();
        source.write_vertices(&mut self.scratch);
        if self.scratch.len() != declared {
            return Err(MosaicError::VertexCountMismatch { declared, emitted: self.scratch.len() });
        }
        Ok(())
    }

    fn ensure_capacity(&mut self, required: usize) {
        if required <= self.vertices.len() {
            return;
        }
        let new_cap = (self.vertices.len() * 2).max(required).max(MIN_CAPACITY);
        log::trace!("geometry buffer grows {} -> {new_cap} vertices", self.vertices.len());
        self.vertices.resize(new_cap, V::zeroed());
    }

    /// Appends a geometry and fills it from `source`. Returns its slot index.
    pub fn add_geometry(&mut self, source: S) -> Result<usize> {
        let declared = source.vertex_count();
        self.generate(&source, declared)?;

        let offset = self.top;
        self.ensure_capacity(offset + declared);
        self.vertices[offset..offset + declared].copy_from_slice(&self.scratch);
        self.top += declared;

        let index = self.records.len();
        self.records.push(GeometryRecord { source, vertex_offset: offset, vertex_count: declared });
        self.mark_dirty(index, index);
        Ok(index)
    }

    /// Regenerates slot `index` in place.
    ///
    /// The generator must emit the slot's original vertex count; otherwise
    /// the call fails and the buffer is left untouched.
    pub fn update_geometry(&mut self, index: usize) -> Result<()> {
        let mut scratch = std::mem::take(&mut self.scratch);
        let record = self.records.get(index).ok_or(MosaicError::UnknownGeometry(index))?;

        scratch.clear();
        record.source.write_vertices(&mut scratch);
        let (offset, declared) = (record.vertex_offset, record.vertex_count);
        if scratch.len() != declared {
            let emitted = scratch.len();
            self.scratch = scratch;
            return Err(MosaicError::VertexCountMismatch { declared, emitted });
        }

        self.vertices[offset..offset + declared].copy_from_slice(&scratch);
        self.scratch = scratch;
        self.mark_dirty(index, index);
        Ok(())
    }

    /// Removes slot `index`, returning its generator.
    ///
    /// Removing the last slot only lowers the top index. Any other slot
    /// moves the tail down in one copy and rebases every later offset.
    pub fn remove_geometry(&mut self, index: usize) -> Result<S> {
        if index >= self.records.len() {
            return Err(MosaicError::UnknownGeometry(index));
        }
        let removed = self.records.remove(index);
        let count = removed.vertex_count;

        if index < self.records.len() {
            self.vertices.copy_within(removed.vertex_end()..self.top, removed.vertex_offset);
            for record in &mut self.records[index..] {
                record.vertex_offset -= count;
            }
            self.mark_dirty(index, self.records.len() - 1);
        }
        self.top -= count;
        Ok(removed.source)
    }

    /// Syncs CPU vertices to the GPU buffer, creating it on first use.
    pub fn flush(&mut self, gpu: &mut dyn GpuDriver) -> Result<()> {
        let buffer = match self.buffer {
            Some(buffer) => buffer,
            None => {
                let buffer = gpu.create_buffer()?;
                self.buffer = Some(buffer);
                buffer
            }
        };

        if self.uploaded_capacity != Some(self.capacity()) {
            gpu.buffer_data(buffer, bytemuck::cast_slice(&self.vertices))?;
            self.uploaded_capacity = Some(self.capacity());
            self.dirty = None;
            return Ok(());
        }

        let Some((first, last)) = self.dirty else {
            return Ok(());
        };
        // Slots may have been removed after being marked.
        let last = last.min(self.records.len().saturating_sub(1));
        if first <= last && first < self.records.len() {
            let start = self.records[first].vertex_offset;
            let end = self.records[last].vertex_end();
            if end > start {
                let stride = std::mem::size_of::<V>();
                gpu.buffer_sub_data(
                    buffer,
                    (start * stride) as u64,
                    bytemuck::cast_slice(&self.vertices[start..end]),
                )?;
            }
        }
        self.dirty = None;
        Ok(())
    }

    /// Flushes, then binds the buffer to attribute `name` of the current program.
    ///
    /// Integral element types go through the integer attribute path.
    pub fn bind(&mut self, gpu: &mut dyn GpuDriver, name: &str) -> Result<()> {
        self.flush(gpu)?;
        let Some(buffer) = self.buffer else {
            return Ok(());
        };
        if V::SCALAR.is_integral() {
            gpu.bind_int_attribute(name, buffer, V::format())?;
        } else {
            gpu.bind_attribute(name, buffer, V::format())?;
        }
        Ok(())
    }

    /// Deletes the GPU buffer. The next flush recreates and fully re-uploads it.
    pub fn release(&mut self, gpu: &mut dyn GpuDriver) {
        if let Some(buffer) = self.buffer.take() {
            gpu.delete_buffer(buffer);
        }
        self.uploaded_capacity = None;
    }
}
