use serde::Serialize;
use serde_json::{json, Value};

/// One tool declaration in the wire contract with the conversational model.
///
/// The name, parameter schema, and description are fixed by the contract;
/// the model matches user speech against the descriptions to decide when to
/// invoke each tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDeclaration {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

pub const INITIATE_ADD_ITEM: &str = "initiateAddItem";
pub const PROVIDE_ITEM_QUANTITY: &str = "provideItemQuantity";
pub const PROVIDE_ITEM_PRICE: &str = "provideItemPrice";
pub const PROVIDE_ITEM_EXPIRY_DATE: &str = "provideItemExpiryDate";
pub const UPDATE_ITEM: &str = "updateItem";
pub const REMOVE_ITEM: &str = "removeItem";
pub const QUERY_INVENTORY: &str = "queryInventory";
pub const PERFORM_BULK_ACTION: &str = "performBulkAction";

/// The full declared tool set, in the order it is sent to the endpoint.
pub fn declarations() -> Vec<ToolDeclaration> {
    vec![
        ToolDeclaration {
            name: INITIATE_ADD_ITEM,
            description: "Initiates adding an item to the inventory. Captures the item name and \
                          optionally the quantity; if the quantity is missing the system will ask \
                          for it. Item names must be translated to English.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "itemName": {
                        "type": "string",
                        "description": "The name of the item to add, translated to English."
                    },
                    "quantity": {
                        "type": "number",
                        "description": "The number of units to add. Optional."
                    }
                },
                "required": ["itemName"]
            }),
        },
        ToolDeclaration {
            name: PROVIDE_ITEM_QUANTITY,
            description: "Provides the quantity for the item currently being added, after the \
                          user was asked for it in a previous turn.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "quantity": {
                        "type": "number",
                        "description": "The quantity of the item."
                    }
                },
                "required": ["quantity"]
            }),
        },
        ToolDeclaration {
            name: PROVIDE_ITEM_PRICE,
            description: "Provides the prices for the item currently being added. Handles both \
                          the selling price (SP) and the cost price (CP).",
            parameters: json!({
                "type": "object",
                "properties": {
                    "price": {
                        "type": "number",
                        "description": "The SELLING PRICE (SP) per unit, what customers pay."
                    },
                    "costPrice": {
                        "type": "number",
                        "description": "The COST PRICE (CP) per unit, what the shopkeeper paid."
                    }
                },
                "required": ["price"]
            }),
        },
        ToolDeclaration {
            name: PROVIDE_ITEM_EXPIRY_DATE,
            description: "Provides the expiry date for the item being added, after the prices. \
                          Natural-language dates must be converted to strict DD-MM-YYYY first.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "expiryDate": {
                        "type": "string",
                        "description": "The expiry date in strict DD-MM-YYYY format."
                    }
                },
                "required": ["expiryDate"]
            }),
        },
        ToolDeclaration {
            name: UPDATE_ITEM,
            description: "Updates the price or quantity of an EXISTING item. Use when the user \
                          wants to edit, change, or set a field, e.g. 'change price of milk to 50'.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "itemName": {
                        "type": "string",
                        "description": "The name of the item to update, translated to English."
                    },
                    "newPrice": {
                        "type": "number",
                        "description": "The new selling price. Optional."
                    },
                    "newCostPrice": {
                        "type": "number",
                        "description": "The new cost price. Optional."
                    },
                    "newQuantity": {
                        "type": "number",
                        "description": "The new absolute quantity. Optional."
                    }
                },
                "required": ["itemName"]
            }),
        },
        ToolDeclaration {
            name: REMOVE_ITEM,
            description: "Removes a quantity of an item from the inventory. Use when the user \
                          wants to remove, take out, or sell something.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "itemName": {
                        "type": "string",
                        "description": "The name of the item to remove, translated to English."
                    },
                    "quantity": {
                        "type": "number",
                        "description": "The number of units to remove."
                    }
                },
                "required": ["itemName", "quantity"]
            }),
        },
        ToolDeclaration {
            name: QUERY_INVENTORY,
            description: "Answers questions about the current inventory: item counts, total \
                          value, availability.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The user's question about the inventory."
                    }
                },
                "required": ["query"]
            }),
        },
        ToolDeclaration {
            name: PERFORM_BULK_ACTION,
            description: "Acts on the currently selected items. Use when the user says 'delete \
                          selected', 'promote selected', or 'clear selection'.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "actionType": {
                        "type": "string",
                        "description": "The action to perform.",
                        "enum": ["delete", "promote", "deselect"]
                    }
                },
                "required": ["actionType"]
            }),
        },
    ]
}

/// Builds the system prompt sent when opening a session: category
/// enforcement, bilingual handling, and the two-price collection rule.
pub fn build_system_prompt(categories: &[String]) -> String {
    let cats = categories.join(", ");
    format!(
        "You are a bilingual inventory assistant for a shopkeeper in India.\n\
         1. Language: understand Hindi, English, and Hinglish accents; speak naturally.\n\
         2. Category enforcement: store categories are [{cats}]. Refuse items that do not \
         fit these categories.\n\
         3. Two-price system: ALWAYS collect BOTH the Cost Price (CP, buying price) and the \
         Selling Price (SP) when adding items. If the user gives only one, ask for the other.\n\
         4. Translation: translate item names to English internally.\n\
         5. Tools: use the provided tools for all database actions."
    )
}
