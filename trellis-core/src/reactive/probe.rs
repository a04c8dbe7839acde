//! A recording subscriber shared by the unit tests.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

use super::dep::{Dep, DepId};
use super::subscriber::{Subscriber, SubscriberId};
use crate::error::{ReactiveError, Result};

/// Records every update into a shared log and de-duplicates its Deps.
pub(crate) struct Probe {
    id: SubscriberId,
    log: Rc<RefCell<Vec<SubscriberId>>>,
    deps: RefCell<HashSet<DepId>>,
    updates: Cell<usize>,
    fail: bool,
}

impl Probe {
    pub(crate) fn new() -> Rc<Self> {
        Self::with_log(Rc::new(RefCell::new(Vec::new())))
    }

    pub(crate) fn with_log(log: Rc<RefCell<Vec<SubscriberId>>>) -> Rc<Self> {
        Rc::new(Self {
            id: SubscriberId::new(),
            log,
            deps: RefCell::new(HashSet::new()),
            updates: Cell::new(0),
            fail: false,
        })
    }

    pub(crate) fn failing(log: Rc<RefCell<Vec<SubscriberId>>>) -> Rc<Self> {
        Rc::new(Self {
            id: SubscriberId::new(),
            log,
            deps: RefCell::new(HashSet::new()),
            updates: Cell::new(0),
            fail: true,
        })
    }

    pub(crate) fn updates(&self) -> usize {
        self.updates.get()
    }

    pub(crate) fn dep_count(&self) -> usize {
        self.deps.borrow().len()
    }
}

impl Subscriber for Probe {
    fn id(&self) -> SubscriberId {
        self.id
    }

    fn add_dep(self: Rc<Self>, dep: &Dep) {
        if self.deps.borrow_mut().insert(dep.id()) {
            dep.add_sub(self.clone());
        }
    }

    fn update(&self) -> Result<()> {
        self.updates.set(self.updates.get() + 1);
        self.log.borrow_mut().push(self.id);
        if self.fail {
            return Err(ReactiveError::subscriber(self.id.raw(), "probe failure"));
        }
        Ok(())
    }
}
