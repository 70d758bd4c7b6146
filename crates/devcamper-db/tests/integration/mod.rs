mod course_tests;
