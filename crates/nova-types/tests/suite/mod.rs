mod capture;
mod inference;
mod lub;
mod store;
mod subtyping;
mod varargs;
