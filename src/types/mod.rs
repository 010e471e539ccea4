pub mod calendar;
pub mod city;
pub mod data_kind;
pub mod records;
