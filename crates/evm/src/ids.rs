/// The path of invocation-child indices from the compilation root, plus a
/// per-context sequence number. Globally unique for every mark minted during
/// one compilation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId {
    pub ctx_id: Box<[u32]>,
    pub sub_id: u32,
}

/// What a [`MarkId`] identifies: the two ends of a sub-object, or a plain
/// jump-destination label, or something else entirely (reserved for
/// future mark kinds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MarkPurpose {
    Start,
    End,
    Label,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkId {
    pub obj_id: ObjectId,
    pub purpose: MarkPurpose,
}

impl MarkId {
    pub fn new(obj_id: ObjectId, purpose: MarkPurpose) -> Self {
        Self { obj_id, purpose }
    }

    pub fn start(obj_id: ObjectId) -> Self {
        Self::new(obj_id, MarkPurpose::Start)
    }

    pub fn end(obj_id: ObjectId) -> Self {
        Self::new(obj_id, MarkPurpose::End)
    }

    pub fn label(obj_id: ObjectId) -> Self {
        Self::new(obj_id, MarkPurpose::Label)
    }

    /// Whether `self` and `other` were allocated from different macro-expansion
    /// contexts. Used to tell a genuine duplicate label apart from the same
    /// label re-declared in a context that shadows it.
    pub fn different_ctx(&self, other: &MarkId) -> bool {
        self.obj_id.ctx_id != other.obj_id.ctx_id
    }
}

/// Allocates [`ObjectId`]s within one macro-expansion context and mints
/// fresh child contexts for nested invocations.
///
/// A `ContextTracker` owns a `ctx_id` prefix and two independent counters:
/// `next_sub_id` numbers objects (labels, table/runtime start+end marks)
/// minted directly in this context, while `next_sub_context_offset` numbers
/// the child contexts handed out to nested macro invocations. Because every
/// child gets a distinct offset appended to the parent's `ctx_id`, and every
/// object minted in a context gets a distinct `sub_id`, the `(ctx_id, sub_id)`
/// pairs produced across an entire compilation are pairwise distinct.
#[derive(Debug, Clone)]
pub struct ContextTracker {
    ctx_id: Box<[u32]>,
    next_sub_id: u32,
    next_sub_context_offset: u32,
}

impl ContextTracker {
    pub fn root() -> Self {
        Self::with_ctx(Box::new([]))
    }

    fn with_ctx(ctx_id: Box<[u32]>) -> Self {
        Self {
            ctx_id,
            next_sub_id: 0,
            next_sub_context_offset: 0,
        }
    }

    pub fn next_obj_id(&mut self) -> ObjectId {
        let sub_id = self.next_sub_id;
        self.next_sub_id += 1;
        ObjectId {
            ctx_id: self.ctx_id.clone(),
            sub_id,
        }
    }

    pub fn next_sub_context(&mut self) -> ContextTracker {
        let offset = self.next_sub_context_offset;
        self.next_sub_context_offset += 1;
        let mut child_ctx = Vec::with_capacity(self.ctx_id.len() + 1);
        child_ctx.extend_from_slice(&self.ctx_id);
        child_ctx.push(offset);
        ContextTracker::with_ctx(child_ctx.into_boxed_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sibling_contexts_never_collide() {
        let mut root = ContextTracker::root();
        let a = root.next_obj_id();
        let mut child1 = root.next_sub_context();
        let mut child2 = root.next_sub_context();
        let b = child1.next_obj_id();
        let c = child2.next_obj_id();
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_eq!(b.ctx_id.as_ref(), &[0]);
        assert_eq!(c.ctx_id.as_ref(), &[1]);
    }

    #[test]
    fn repeated_obj_ids_in_same_context_increment() {
        let mut ctx = ContextTracker::root();
        let a = ctx.next_obj_id();
        let b = ctx.next_obj_id();
        assert_eq!(a.ctx_id, b.ctx_id);
        assert_eq!(a.sub_id, 0);
        assert_eq!(b.sub_id, 1);
    }
}
