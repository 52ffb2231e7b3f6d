pub mod daily_bar;
