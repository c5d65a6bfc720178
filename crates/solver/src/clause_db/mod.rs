mod clause;
mod store;

pub use self::{
    clause::Clause,
    store::{
        ClauseId,
        ClauseStore,
    },
};
