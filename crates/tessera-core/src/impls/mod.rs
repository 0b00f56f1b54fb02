//! Built-in nets and operators.
//!
//! `FactoryRegistry::with_builtins` registers everything listed here.

pub mod ops;
pub mod simple_net;

pub use self::simple_net::SimpleNet;

use std::sync::Arc;

use crate::domain::{NetDef, OperatorDef, DEFAULT_NET_TYPE};
use crate::error::ConstructionError;
use crate::ports::{Net, Operator};
use crate::registry::{NetFactory, OperatorFactory};
use crate::workspace::Workspace;

fn net<F>(factory: F) -> NetFactory
where
    F: Fn(&NetDef, &mut Workspace<'_>) -> Result<Box<dyn Net>, ConstructionError>
        + Send
        + Sync
        + 'static,
{
    Arc::new(factory)
}

fn operator<F>(factory: F) -> OperatorFactory
where
    F: Fn(&OperatorDef, &mut Workspace<'_>) -> Result<Box<dyn Operator>, ConstructionError>
        + Send
        + Sync
        + 'static,
{
    Arc::new(factory)
}

pub fn builtin_nets() -> Vec<(&'static str, NetFactory)> {
    vec![(
        DEFAULT_NET_TYPE,
        net(|def, ws| Ok(Box::new(SimpleNet::new(def, ws)?))),
    )]
}

pub fn builtin_operators() -> Vec<(&'static str, OperatorFactory)> {
    vec![
        (
            "ConstantFill",
            operator(|def, ws| Ok(Box::new(ops::ConstantFill::new(def, ws)?))),
        ),
        ("Copy", operator(|def, ws| Ok(Box::new(ops::Copy::new(def, ws)?)))),
        ("Add", operator(|def, ws| Ok(Box::new(ops::Add::new(def, ws)?)))),
        ("Scale", operator(|def, ws| Ok(Box::new(ops::Scale::new(def, ws)?)))),
        ("Alias", operator(|def, ws| Ok(Box::new(ops::Alias::new(def, ws)?)))),
        (
            "CountDown",
            operator(|def, ws| Ok(Box::new(ops::CountDown::new(def, ws)?))),
        ),
        ("Fail", operator(|def, ws| Ok(Box::new(ops::Fail::new(def, ws)?)))),
    ]
}
