mod panels;
mod stats;
