// Item parsing (struct, enum, function, interface, const, import, export)

mod aliases;
mod consts;
mod enums;
mod exports;
mod externs;
mod functions;
mod helpers;
mod imports;
mod structs;
mod traits;
