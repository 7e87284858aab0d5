//! Multi-turn slot-filling and tool dispatch
//!
//! This module tracks a partially specified inventory mutation across
//! conversational turns (`DialogueSlot`), declares the tool set the remote
//! model may invoke, and executes those tool calls against the inventory
//! store and usage gate (`ToolDispatcher`).

mod dispatcher;
mod slot;
mod tools;

pub use dispatcher::{
    PromoGenerator, PromoNotice, SelectionSet, TemplatePromo, ToolDispatcher, ToolResult,
};
pub use slot::DialogueSlot;
pub use tools::{
    build_system_prompt, declarations, ToolDeclaration, INITIATE_ADD_ITEM, PERFORM_BULK_ACTION,
    PROVIDE_ITEM_EXPIRY_DATE, PROVIDE_ITEM_PRICE, PROVIDE_ITEM_QUANTITY, QUERY_INVENTORY,
    REMOVE_ITEM, UPDATE_ITEM,
};
