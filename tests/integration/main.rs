//! Integration tests: the engine against an in-memory bidding strategy service.

mod engine_flow;
